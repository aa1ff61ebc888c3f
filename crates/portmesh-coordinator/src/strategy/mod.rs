//! Distribution methods: the two ways this harness hands subparts out to
//! scanners and reacts to completion/detection signals.

pub mod naive;
pub mod parallel;

use portmesh_core::{event_bus::EventReceiver, HostRecord, Subpart};
use portmesh_rpc::messages::{ExecScanRequest, StartSnitchRequest};

use crate::experiment::ExperimentContext;

/// Ports handed to a single scanner per subpart when a chunk size isn't
/// otherwise specified by the configuration.
pub(crate) const DEFAULT_PORTS_PER_SUBPART: usize = 8;

/// Arm every configured firewall's snitch. Monitoring is started per
/// strategy rather than in `pre_experiment`, because only strategies that
/// consume live detection events need it running before dispatch.
pub(crate) async fn arm_firewalls(ctx: &ExperimentContext) {
    for firewall in &ctx.firewalls {
        let req = StartSnitchRequest {
            patterns: ctx.firewall_args.patterns.clone(),
            logfile: ctx.firewall_args.logfile.clone(),
            interval_secs: ctx.firewall_args.timing,
            coordinator: Some(ctx.coordinator),
        };
        if let Err(e) = ctx.client.start_snitch(firewall.address, firewall.port, req).await {
            tracing::warn!(firewall = %firewall.address, error = %e, "failed to start snitch");
        }
    }
}

/// Send one subpart to a scanner, telling it where to report completion.
pub(crate) async fn dispatch(ctx: &ExperimentContext, scanner: HostRecord, subpart: &Subpart) {
    let req = ExecScanRequest {
        method: ctx.scan_method.clone(),
        timing: ctx.timing,
        target: subpart.target,
        ports: subpart.ports.clone(),
        coordinator: Some(ctx.coordinator),
    };

    if let Err(e) = ctx.client.exec_scan(scanner.address, scanner.port, req).await {
        tracing::warn!(
            scanner = %scanner.address, target = %subpart.target, error = %e,
            "failed to dispatch subpart"
        );
    }
}

/// Run the experiment using whichever distribution method the
/// configuration named, returning the accumulated observation state.
pub async fn run(
    ctx: &ExperimentContext,
    rx: &mut EventReceiver,
) -> crate::experiment::ExperimentState {
    match ctx.distribution_method.as_str() {
        "naive" => naive::run(ctx).await,
        _ => parallel::run(ctx, rx).await,
    }
}
