//! A single experiment instance's lifecycle: arm the target monitors, fold
//! in scan completions as they arrive, then fuse the three observation
//! streams into an ASR once the subparts are exhausted.

use std::net::IpAddr;

use portmesh_core::{
    Alert, DetectedSet, FirewallArgsConfig, HostRecord, PortState, PortStateObservation,
    TimingTemplate, TrafficObservation,
};
use portmesh_rpc::messages::{CoordinatorAddr, StartMonitorRequest};
use portmesh_rpc::RpcClient;

use crate::fusion;

/// Everything a single run of one experiment needs that doesn't change
/// as subparts get dispatched and completed.
pub struct ExperimentContext {
    pub client: RpcClient,
    pub distribution_method: String,
    pub scan_method: String,
    pub timing: TimingTemplate,
    pub scanners: Vec<HostRecord>,
    pub firewalls: Vec<HostRecord>,
    pub targets: Vec<HostRecord>,
    pub ports: Vec<u16>,
    pub firewall_args: FirewallArgsConfig,
    pub coordinator: CoordinatorAddr,
}

/// Arm every target's traffic monitor before the first subpart is
/// dispatched. Firewall snitches are armed by the chosen distribution
/// strategy itself, not here, since only some strategies consume live
/// detection (see `strategy::arm_firewalls`).
pub async fn pre_experiment(ctx: &ExperimentContext) {
    let scanner_ips: Vec<IpAddr> = ctx.scanners.iter().map(|s| s.address).collect();

    for target in &ctx.targets {
        let req = StartMonitorRequest {
            scanner_ips: scanner_ips.clone(),
        };
        if let Err(e) = ctx.client.start_monitor(target.address, target.port, req).await {
            tracing::warn!(target = %target.address, error = %e, "failed to start target monitor");
        }
    }
}

/// Accumulated state for one experiment instance: what scanners have
/// reported, what traffic has been captured, and who's been detected.
#[derive(Default)]
pub struct ExperimentState {
    pub portstate: PortStateObservation,
    pub traffic: TrafficObservation,
    pub detected: DetectedSet,
}

impl ExperimentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection(&mut self, alert: &Alert) {
        self.detected.insert(alert.ip_src);
    }

    /// Fold a finished scanner subpart into the running observation,
    /// fetching its classification and sent-traffic via `scan_state`.
    pub async fn record_scan_completion(
        &mut self,
        client: &RpcClient,
        scanner: HostRecord,
        target: IpAddr,
    ) {
        let resp = match client.scan_state(scanner.address, scanner.port).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(
                    scanner = %scanner.address, %target, error = %e,
                    "failed to fetch scan state after completion"
                );
                return;
            }
        };

        let classifications = self.portstate.scanners.entry(target).or_default();
        for (port, state) in resp.portstate {
            classifications.insert(port, (state, scanner.address));
        }

        let sent = self
            .traffic
            .scanners
            .entry(scanner.address)
            .or_default()
            .entry(target)
            .or_default();
        for (port, pkts) in resp.traffic {
            sent.entry(port).or_default().extend(pkts);
        }
    }

    /// Stop every agent's collection, pull ground truth and captured
    /// traffic off the targets, and compute the resulting ASR.
    pub async fn finalize(&mut self, ctx: &ExperimentContext) -> f64 {
        for firewall in &ctx.firewalls {
            if let Err(e) = ctx.client.stop_snitch(firewall.address, firewall.port).await {
                tracing::warn!(firewall = %firewall.address, error = %e, "failed to stop snitch");
            }
        }

        for target in &ctx.targets {
            if let Err(e) = ctx.client.stop_monitor(target.address, target.port).await {
                tracing::warn!(target = %target.address, error = %e, "failed to stop monitor");
                continue;
            }

            match ctx.client.get_open_ports(target.address, target.port).await {
                Ok(resp) => {
                    let ground_truth = self.portstate.targets.entry(target.address).or_default();
                    for &port in &ctx.ports {
                        let state = if resp.ports.contains(&port) {
                            PortState::Open
                        } else {
                            PortState::Closed
                        };
                        ground_truth.insert(port, state);
                    }
                }
                Err(e) => {
                    tracing::warn!(target = %target.address, error = %e, "failed to fetch open ports");
                }
            }

            match ctx.client.get_traffic(target.address, target.port).await {
                Ok(resp) => {
                    let captured = self.traffic.targets.entry(target.address).or_default();
                    for (scanner_ip, by_port) in resp.traffic {
                        let scanner_entry = captured.entry(scanner_ip).or_default();
                        for (port, pkts) in by_port {
                            scanner_entry.entry(port).or_default().extend(pkts);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target = %target.address, error = %e, "failed to fetch captured traffic");
                }
            }
        }

        let target_addrs: Vec<IpAddr> = ctx.targets.iter().map(|t| t.address).collect();
        fusion::compute_asr(&ctx.ports, &target_addrs, &self.portstate, &self.traffic, &ctx.scan_method)
    }
}
