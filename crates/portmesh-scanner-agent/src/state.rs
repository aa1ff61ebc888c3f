//! Shared, lock-guarded state for one scanner agent process.

use std::collections::HashMap;
use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use portmesh_core::{Event, Pkt, PortState};
use portmesh_rpc::messages::{CoordinatorAddr, ExecScanRequest, ScanStateResponse};
use portmesh_rpc::RpcClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;

use crate::probe;

#[derive(Default)]
struct ScanResults {
    portstate: HashMap<u16, PortState>,
    traffic: HashMap<u16, Vec<Pkt>>,
}

/// Agent-wide state: the scanner's own RPC address and the single
/// in-flight (or last-completed) scan job.
pub struct ScannerState {
    own_addr: IpAddr,
    results: Mutex<ScanResults>,
    running: Mutex<bool>,
    child: AsyncMutex<Option<tokio::process::Child>>,
}

impl ScannerState {
    pub fn new(own_addr: IpAddr) -> Arc<Self> {
        Arc::new(Self {
            own_addr,
            results: Mutex::new(ScanResults::default()),
            running: Mutex::new(false),
            child: AsyncMutex::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    pub fn scan_state(&self) -> ScanStateResponse {
        let results = self.results.lock();
        ScanStateResponse {
            portstate: results.portstate.clone(),
            traffic: results.traffic.clone(),
        }
    }

    /// Kill the in-flight probe, if any. The reader task observes the
    /// process exit and tears down `running` on its own.
    pub async fn stop_scan(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            let _ = child.kill().await;
        }
    }

    /// Reset state, spawn the probe, and hand ownership of reading its
    /// stdout (and firing the completion callback) to a detached task.
    pub async fn exec_scan(self: &Arc<Self>, req: ExecScanRequest) {
        {
            let mut results = self.results.lock();
            *results = ScanResults::default();
        }
        *self.running.lock() = true;

        let logfile = probe::logfile_name(&req.method);
        let mut cmd = probe::build_command(&req.method, req.timing, req.target, &req.ports, &logfile);
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(error = %err, "failed to spawn probe process");
                *self.running.lock() = false;
                return;
            }
        };
        let stdout = child.stdout.take();
        *self.child.lock().await = Some(child);

        let state = Arc::clone(self);
        let target = req.target;
        let coordinator = req.coordinator;
        tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    state.apply_probe_line(&line);
                }
            }

            // Reap the child so it doesn't linger as a zombie.
            if let Some(mut child) = state.child.lock().await.take() {
                let _ = child.wait().await;
            }
            *state.running.lock() = false;

            if let Some(coord) = coordinator {
                state.notify_completion(coord, target).await;
            }
        });
    }

    fn apply_probe_line(&self, line: &str) {
        let Some(parsed) = probe::parse_line(line) else {
            return;
        };
        let mut results = self.results.lock();
        match parsed {
            probe::ProbeLine::Sent { port_dst, pkt, .. } => {
                results.traffic.entry(port_dst).or_default().push(pkt);
            }
            probe::ProbeLine::Rcvd { port_src, pkt, .. } => {
                results.traffic.entry(port_src).or_default().push(pkt);
            }
            probe::ProbeLine::PortState { port, state } => {
                results.portstate.insert(port, state);
            }
        }
    }

    async fn notify_completion(&self, coordinator: CoordinatorAddr, target: IpAddr) {
        let client = RpcClient::new();
        let event = Event::Scanner {
            scanner: self.own_addr,
            target,
        };
        if let Err(err) = client
            .add_event(
                coordinator.ip,
                coordinator.port,
                portmesh_rpc::messages::AddEventRequest { event },
            )
            .await
        {
            tracing::warn!(error = %err, "failed to deliver scan-completion event");
        }
    }
}
