//! Request/response payloads for every RPC method named in the control
//! plane, shared verbatim between `client` and `server` so both sides
//! agree on the wire shape.

use portmesh_core::{Alert, Event, Pkt, PortState, TimingTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// A coordinator callback address, carried inside scan/snitch requests
/// so agents know where to deliver `add_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorAddr {
    pub ip: IpAddr,
    pub port: u16,
}

// ===== Scanner agent =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecScanRequest {
    pub method: String,
    pub timing: TimingTemplate,
    pub target: IpAddr,
    pub ports: Vec<u16>,
    pub coordinator: Option<CoordinatorAddr>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PollScanResponse {
    pub running: bool,
}

/// `scan_state`'s view of a single scanner's in-progress or last-completed scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStateResponse {
    pub portstate: HashMap<u16, PortState>,
    pub traffic: HashMap<u16, Vec<Pkt>>,
}

// ===== Firewall agent =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSnitchRequest {
    pub patterns: Vec<String>,
    pub logfile: String,
    pub interval_secs: f64,
    pub coordinator: Option<CoordinatorAddr>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnitchStateResponse {
    pub alerts: Vec<Alert>,
}

// ===== Target agent =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMonitorRequest {
    pub scanner_ips: Vec<IpAddr>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetTrafficResponse {
    /// scanner -> local port -> packets captured inbound from that scanner
    pub traffic: HashMap<IpAddr, HashMap<u16, Vec<Pkt>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetOpenPortsResponse {
    pub ports: Vec<u16>,
}

// ===== Coordinator =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddEventRequest {
    pub event: Event,
}

/// Empty body used for requests/responses with no payload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_scan_request_round_trip() {
        let req = ExecScanRequest {
            method: "syn".to_string(),
            timing: TimingTemplate::Normal,
            target: "10.0.0.2".parse().unwrap(),
            ports: vec![22, 80],
            coordinator: Some(CoordinatorAddr {
                ip: "10.0.0.1".parse().unwrap(),
                port: 9000,
            }),
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ExecScanRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.ports, vec![22, 80]);
        assert_eq!(parsed.coordinator.unwrap().port, 9000);
    }

    #[test]
    fn test_scan_state_response_round_trip() {
        let mut resp = ScanStateResponse::default();
        resp.portstate.insert(80, PortState::Open);
        resp.traffic.insert(80, vec![Pkt::new("SA")]);

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: ScanStateResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.portstate[&80], PortState::Open);
        assert_eq!(parsed.traffic[&80].len(), 1);
    }

    #[test]
    fn test_add_event_request_round_trip() {
        let req = AddEventRequest {
            event: Event::Scanner {
                scanner: "10.0.0.1".parse().unwrap(),
                target: "10.0.0.2".parse().unwrap(),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: AddEventRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event, req.event);
    }
}
