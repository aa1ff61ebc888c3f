//! Shared state for one target agent process.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use portmesh_core::Pkt;
use portmesh_rpc::messages::{GetOpenPortsResponse, GetTrafficResponse};

use crate::{packet, proc_net};

const PROC_NET_TCP: &str = "/proc/net/tcp";

pub struct MonitorState {
    /// Interface to sniff on; `None` lets the capture backend auto-detect.
    iface: Option<String>,
    active: Arc<AtomicBool>,
    /// scanner -> local (target-side) port -> packets observed inbound
    traffic: Mutex<HashMap<IpAddr, HashMap<u16, Vec<Pkt>>>>,
}

impl MonitorState {
    pub fn new(iface: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            iface,
            active: Arc::new(AtomicBool::new(false)),
            traffic: Mutex::new(HashMap::new()),
        })
    }

    pub fn get_traffic(&self) -> GetTrafficResponse {
        GetTrafficResponse {
            traffic: self.traffic.lock().clone(),
        }
    }

    pub fn get_open_ports(&self) -> GetOpenPortsResponse {
        GetOpenPortsResponse {
            ports: proc_net::read_listening_ports(&PathBuf::from(PROC_NET_TCP)),
        }
    }

    pub fn stop_monitor(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn start_monitor(self: &Arc<Self>, scanner_ips: Vec<IpAddr>) {
        *self.traffic.lock() = HashMap::new();
        self.active.store(true, Ordering::SeqCst);

        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || state.capture_loop(scanner_ips));
    }

    /// Runs on a blocking-pool thread because [`PacketCapture`] is a
    /// synchronous, timeout-polling interface.
    ///
    /// [`PacketCapture`]: portmesh_network::capture::PacketCapture
    fn capture_loop(&self, scanner_ips: Vec<IpAddr>) {
        let mut capture = match portmesh_network::capture::create_capture() {
            Ok(capture) => capture,
            Err(err) => {
                tracing::warn!(error = %err, "failed to create packet capture");
                self.active.store(false, Ordering::SeqCst);
                return;
            }
        };

        if let Err(err) = capture.open(self.iface.as_deref()) {
            tracing::warn!(error = %err, "failed to open packet capture");
            self.active.store(false, Ordering::SeqCst);
            return;
        }

        while self.active.load(Ordering::SeqCst) {
            match capture.receive_packet(200) {
                Ok(Some(frame)) => self.record_frame(&frame, &scanner_ips),
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(error = %err, "packet capture read failed");
                }
            }
        }

        let _ = capture.close();
    }

    fn record_frame(&self, frame: &[u8], scanner_ips: &[IpAddr]) {
        let Some(observation) = packet::parse_tcp_segment(frame) else {
            return;
        };

        let scanner_is_src = scanner_ips.contains(&observation.src);
        let scanner_is_dst = scanner_ips.contains(&observation.dst);
        if !scanner_is_src && !scanner_is_dst {
            return;
        }

        // Only the scanner->target half matters to fusion; the reverse
        // direction is observed but intentionally not stored.
        if !scanner_is_src {
            return;
        }

        let mut traffic = self.traffic.lock();
        traffic
            .entry(observation.src)
            .or_default()
            .entry(observation.dport)
            .or_default()
            .push(observation.pkt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_open_ports_reflects_live_proc_net_tcp() {
        let state = MonitorState::new(None);
        // /proc/net/tcp may not exist in a sandboxed test environment;
        // the call must not panic either way.
        let _ = state.get_open_ports();
    }

    #[test]
    fn test_get_traffic_starts_empty() {
        let state = MonitorState::new(None);
        assert!(state.get_traffic().traffic.is_empty());
    }
}
