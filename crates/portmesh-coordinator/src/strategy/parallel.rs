//! Event-driven dispatch: every scanner works a subpart concurrently;
//! completions hand out the next subpart, detections stop that scanner.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use portmesh_core::event_bus::EventReceiver;
use portmesh_core::Event;

use super::{arm_firewalls, dispatch, DEFAULT_PORTS_PER_SUBPART};
use crate::experiment::{ExperimentContext, ExperimentState};
use crate::subpart;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(ctx: &ExperimentContext, rx: &mut EventReceiver) -> ExperimentState {
    let mut state = ExperimentState::new();

    let target_addrs: Vec<IpAddr> = ctx.targets.iter().map(|t| t.address).collect();
    let mut subparts = subpart::generate_by_chunk_size(&target_addrs, &ctx.ports, DEFAULT_PORTS_PER_SUBPART);

    // scanner address -> target it's currently working
    let mut in_flight: HashMap<IpAddr, IpAddr> = HashMap::new();
    let mut current_jobs = 0usize;

    arm_firewalls(ctx).await;

    for &scanner in &ctx.scanners {
        if let Some(subpart) = subparts.pop() {
            dispatch(ctx, scanner, &subpart).await;
            in_flight.insert(scanner.address, subpart.target);
            current_jobs += 1;
        }
    }

    while !subparts.is_empty() || current_jobs > 0 {
        let events = rx.drain();
        if events.is_empty() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        }

        // Firewall detections are applied before scanner completions in the
        // same batch, so a scanner flagged and completed within one poll
        // cycle is retired once and never redispatched.
        let (firewall_events, scanner_events): (Vec<_>, Vec<_>) =
            events.into_iter().partition(|e| matches!(e, Event::Firewall { .. }));

        for event in firewall_events {
            let Event::Firewall { alert } = event else {
                unreachable!()
            };
            let scanner = alert.ip_src;
            let Some(&host) = ctx.scanners.iter().find(|s| s.address == scanner) else {
                // An alert naming a scanner outside this experiment is dropped.
                continue;
            };

            if let Err(e) = ctx.client.stop_scan(host.address, host.port).await {
                tracing::warn!(scanner = %scanner, error = %e, "failed to stop detected scanner");
            }

            if let Some(target) = in_flight.remove(&scanner) {
                state.record_scan_completion(&ctx.client, host, target).await;
                current_jobs = current_jobs.saturating_sub(1);
            }

            state.record_detection(&alert);
        }

        for event in scanner_events {
            let Event::Scanner { scanner, target } = event else {
                unreachable!()
            };

            // Already retired by a firewall detection processed above this
            // same cycle; its results were already folded in.
            if in_flight.remove(&scanner).is_none() {
                continue;
            }
            current_jobs = current_jobs.saturating_sub(1);

            let Some(&host) = ctx.scanners.iter().find(|s| s.address == scanner) else {
                continue;
            };
            state.record_scan_completion(&ctx.client, host, target).await;

            if !state.detected.contains(&scanner) {
                if let Some(subpart) = subparts.pop() {
                    dispatch(ctx, host, &subpart).await;
                    in_flight.insert(scanner, subpart.target);
                    current_jobs += 1;
                }
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use portmesh_core::event_bus::event_queue;
    use portmesh_core::{FirewallArgsConfig, HostRecord, PortState, TimingTemplate};
    use portmesh_rpc::messages::{CoordinatorAddr, Empty, ScanStateResponse};
    use portmesh_rpc::RpcClient;
    use tokio::net::TcpListener;

    #[test]
    fn test_idle_poll_interval_is_sub_second() {
        assert!(IDLE_POLL_INTERVAL < Duration::from_secs(1));
    }

    async fn exec_scan_handler() -> Json<Empty> {
        Json(Empty {})
    }

    async fn scan_state_handler() -> Json<ScanStateResponse> {
        let mut resp = ScanStateResponse::default();
        resp.portstate.insert(80, PortState::Open);
        Json(resp)
    }

    #[tokio::test]
    async fn test_parallel_run_folds_completion_from_pending_event() {
        let router = Router::new()
            .route("/exec_scan", post(exec_scan_handler))
            .route("/scan_state", post(scan_state_handler));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let scanner = HostRecord::new(addr.ip(), addr.port());
        let target: IpAddr = "10.0.0.9".parse().unwrap();

        let ctx = ExperimentContext {
            client: RpcClient::new(),
            distribution_method: "parallel".to_string(),
            scan_method: "syn".to_string(),
            timing: TimingTemplate::Normal,
            scanners: vec![scanner],
            firewalls: vec![],
            targets: vec![HostRecord::new(target, 0)],
            ports: vec![80],
            firewall_args: FirewallArgsConfig {
                patterns: vec![],
                logfile: String::new(),
                timing: 1.0,
            },
            coordinator: CoordinatorAddr {
                ip: "127.0.0.1".parse().unwrap(),
                port: 0,
            },
        };

        let (tx, mut rx) = event_queue(16);
        tx.send(Event::Scanner {
            scanner: scanner.address,
            target,
        })
        .await;

        let state = run(&ctx, &mut rx).await;

        assert_eq!(
            state.portstate.scanners.get(&target).and_then(|m| m.get(&80)),
            Some(&(PortState::Open, scanner.address))
        );
    }
}
