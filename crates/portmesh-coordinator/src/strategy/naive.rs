//! Sequential dispatch: one scanner works through subparts until a
//! firewall flags it, then the next scanner picks up where it left off.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

use portmesh_core::{Alert, HostRecord};

use super::{arm_firewalls, dispatch, DEFAULT_PORTS_PER_SUBPART};
use crate::experiment::{ExperimentContext, ExperimentState};
use crate::subpart;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(ctx: &ExperimentContext) -> ExperimentState {
    let mut state = ExperimentState::new();

    let target_addrs: Vec<IpAddr> = ctx.targets.iter().map(|t| t.address).collect();
    let mut subparts: VecDeque<_> =
        subpart::generate_by_chunk_size(&target_addrs, &ctx.ports, DEFAULT_PORTS_PER_SUBPART).into();

    arm_firewalls(ctx).await;

    for &scanner in &ctx.scanners {
        loop {
            let Some(subpart) = subparts.pop_front() else {
                break;
            };

            dispatch(ctx, scanner, &subpart).await;
            let detection = poll_until_done(ctx, scanner).await;
            state.record_scan_completion(&ctx.client, scanner, subpart.target).await;

            if let Some(alert) = detection {
                state.record_detection(&alert);
                break;
            }
        }
    }

    state
}

/// Poll a scanner until it reports idle, checking every firewall for a
/// detection of it on each pass; stops the scan the moment one fires.
async fn poll_until_done(ctx: &ExperimentContext, scanner: HostRecord) -> Option<Alert> {
    loop {
        match ctx.client.poll_scan(scanner.address, scanner.port).await {
            Ok(resp) if !resp.running => return None,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(scanner = %scanner.address, error = %e, "poll_scan failed");
                return None;
            }
        }

        for &firewall in &ctx.firewalls {
            let Ok(resp) = ctx.client.snitch_state(firewall.address, firewall.port).await else {
                continue;
            };
            if let Some(alert) = resp.alerts.into_iter().find(|a| a.ip_src == scanner.address) {
                if let Err(e) = ctx.client.stop_scan(scanner.address, scanner.port).await {
                    tracing::warn!(scanner = %scanner.address, error = %e, "failed to stop detected scanner");
                }
                return Some(alert);
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use portmesh_rpc::messages::{Empty, PollScanResponse, SnitchStateResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[test]
    fn test_poll_interval_is_sub_second() {
        assert!(POLL_INTERVAL < Duration::from_secs(1));
    }

    async fn poll_scan_still_running() -> Json<PollScanResponse> {
        Json(PollScanResponse { running: true })
    }

    async fn stop_scan_handler(State(calls): State<Arc<AtomicUsize>>) -> Json<Empty> {
        calls.fetch_add(1, Ordering::SeqCst);
        Json(Empty {})
    }

    async fn snitch_state_handler(State(alert): State<Alert>) -> Json<SnitchStateResponse> {
        Json(SnitchStateResponse { alerts: vec![alert] })
    }

    async fn serve(router: Router) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_poll_until_done_stops_scan_on_detection() {
        let stop_calls = Arc::new(AtomicUsize::new(0));

        let scanner_router = Router::new()
            .route("/poll_scan", post(poll_scan_still_running))
            .route("/stop_scan", post(stop_scan_handler))
            .with_state(stop_calls.clone());
        let scanner_addr = serve(scanner_router).await;
        let scanner = HostRecord::new(scanner_addr.ip(), scanner_addr.port());

        let alert = Alert {
            patterns: vec!["SCAN".to_string()],
            detected_by: "10.0.0.99".parse().unwrap(),
            ip_src: scanner.address,
            ip_dst: "10.0.0.50".parse().unwrap(),
            date: 1_700_000_000,
        };

        let firewall_router = Router::new()
            .route("/snitch_state", post(snitch_state_handler))
            .with_state(alert.clone());
        let firewall_addr = serve(firewall_router).await;
        let firewall = HostRecord::new(firewall_addr.ip(), firewall_addr.port());

        let ctx = ExperimentContext {
            client: portmesh_rpc::RpcClient::new(),
            distribution_method: "naive".to_string(),
            scan_method: "syn".to_string(),
            timing: portmesh_core::TimingTemplate::Normal,
            scanners: vec![scanner],
            firewalls: vec![firewall],
            targets: vec![],
            ports: vec![80],
            firewall_args: portmesh_core::FirewallArgsConfig {
                patterns: vec![],
                logfile: String::new(),
                timing: 1.0,
            },
            coordinator: portmesh_rpc::messages::CoordinatorAddr {
                ip: "127.0.0.1".parse().unwrap(),
                port: 0,
            },
        };

        let detection = poll_until_done(&ctx, scanner).await;

        assert_eq!(detection.as_ref().map(|a| a.ip_src), Some(scanner.address));
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    }
}
