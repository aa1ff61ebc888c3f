//! The outer experiment-matrix driver: the cross-product of distribution
//! methods, scan methods, scan timings, and host counts, repeated `count`
//! times, each run through its own fresh inbound endpoint.

use std::net::IpAddr;
use std::time::Duration;

use portmesh_core::{Config, TimingTemplate};
use portmesh_rpc::RpcClient;
use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::Instrument;

use crate::experiment::{pre_experiment, ExperimentContext};
use crate::inbound::InboundEndpoint;
use crate::strategy;

/// Pause between successive experiments so agents fully settle (closed
/// sockets, flushed log files) before the next one starts.
const INTER_EXPERIMENT_SLEEP: Duration = Duration::from_millis(200);

/// Run every experiment named by the configuration's cross-product.
///
/// `bind_ip` is the address agents should be told to reach this
/// coordinator's inbound `add_event` endpoint on.
pub async fn run_matrix(config: &Config, bind_ip: IpAddr) {
    let exp = &config.experiments;

    for iteration in 0..exp.count {
        for distribution_method in &exp.distribution_methods {
            for scan_method in &exp.scan_methods {
                for &timing in &exp.scan_timings {
                    for &nb_scanners in &exp.scanner_number_values {
                        for &nb_targets in &exp.target_number_values {
                            let span = tracing::info_span!(
                                "experiment",
                                iteration,
                                method = %distribution_method,
                                scan = %scan_method,
                                timing = %timing,
                                nb_scanners,
                                nb_targets,
                            );

                            run_one(
                                config,
                                bind_ip,
                                distribution_method,
                                scan_method,
                                timing,
                                nb_scanners,
                                nb_targets,
                            )
                            .instrument(span)
                            .await;

                            tokio::time::sleep(INTER_EXPERIMENT_SLEEP).await;
                        }
                    }
                }
            }
        }
    }
}

async fn run_one(
    config: &Config,
    bind_ip: IpAddr,
    distribution_method: &str,
    scan_method: &str,
    timing: TimingTemplate,
    nb_scanners: usize,
    nb_targets: usize,
) {
    let mut rng = thread_rng();
    let scanners = config
        .hosts
        .scanners
        .choose_multiple(&mut rng, nb_scanners)
        .copied()
        .collect();
    let targets = config
        .hosts
        .targets
        .choose_multiple(&mut rng, nb_targets)
        .copied()
        .collect();

    let (inbound, mut rx) = match InboundEndpoint::start(bind_ip).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind inbound event endpoint, skipping experiment");
            return;
        }
    };

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: distribution_method.to_string(),
        scan_method: scan_method.to_string(),
        timing,
        scanners,
        firewalls: config.hosts.firewalls.clone(),
        targets,
        ports: config.experiments.ports.to_vec(),
        firewall_args: config.experiments.firewall_args.clone(),
        coordinator: inbound.addr,
    };

    tracing::info!("pre_experiment");
    pre_experiment(&ctx).await;

    tracing::info!("run_experiment");
    let mut state = strategy::run(&ctx, &mut rx).await;

    tracing::info!("post_experiment");
    let asr = state.finalize(&ctx).await;

    tracing::info!(asr, detected = state.detected.len(), "experiment finished");

    inbound.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inter_experiment_sleep_is_bounded() {
        assert!(INTER_EXPERIMENT_SLEEP < Duration::from_secs(2));
    }
}
