//! Mock scanner/target/firewall agents for driving the coordinator's
//! experiment pipeline end to end over real HTTP, the way the unit test
//! in `strategy::parallel` already does for a single scanner.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use portmesh_core::{Alert, HostRecord, Pkt, PortState};
use portmesh_rpc::messages::*;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct CallCounts {
    pub exec_scan: Arc<Mutex<usize>>,
}

#[derive(Clone, Default)]
pub struct MockScannerConfig {
    pub portstate: HashMap<u16, PortState>,
    pub traffic: HashMap<u16, Vec<Pkt>>,
    pub poll_running: bool,
}

#[derive(Clone)]
struct ScannerState {
    config: MockScannerConfig,
    calls: CallCounts,
}

pub struct MockAgent {
    pub host: HostRecord,
    pub calls: CallCounts,
}

async fn exec_scan(State(state): State<ScannerState>, Json(_req): Json<ExecScanRequest>) -> Json<Empty> {
    *state.calls.exec_scan.lock().unwrap() += 1;
    Json(Empty {})
}

async fn stop_scan() -> Json<Empty> {
    Json(Empty {})
}

async fn poll_scan(State(state): State<ScannerState>) -> Json<PollScanResponse> {
    Json(PollScanResponse { running: state.config.poll_running })
}

async fn scan_state(State(state): State<ScannerState>) -> Json<ScanStateResponse> {
    Json(ScanStateResponse {
        portstate: state.config.portstate.clone(),
        traffic: state.config.traffic.clone(),
    })
}

/// Spin up a scanner agent that answers `exec_scan`/`stop_scan`/`scan_state`
/// with a canned classification and traffic trace, counting `exec_scan` calls.
pub async fn spawn_mock_scanner(config: MockScannerConfig) -> MockAgent {
    let calls = CallCounts::default();
    let state = ScannerState { config, calls: calls.clone() };

    let router = Router::new()
        .route("/exec_scan", post(exec_scan))
        .route("/stop_scan", post(stop_scan))
        .route("/poll_scan", post(poll_scan))
        .route("/scan_state", post(scan_state))
        .with_state(state);

    let addr = serve(router).await;
    MockAgent { host: HostRecord::new(addr.ip(), addr.port()), calls }
}

#[derive(Clone, Default)]
pub struct MockTargetConfig {
    pub open_ports: Vec<u16>,
    pub traffic: HashMap<std::net::IpAddr, HashMap<u16, Vec<Pkt>>>,
}

async fn start_monitor() -> Json<Empty> {
    Json(Empty {})
}

async fn stop_monitor() -> Json<Empty> {
    Json(Empty {})
}

async fn get_open_ports(State(config): State<MockTargetConfig>) -> Json<GetOpenPortsResponse> {
    Json(GetOpenPortsResponse { ports: config.open_ports.clone() })
}

async fn get_traffic(State(config): State<MockTargetConfig>) -> Json<GetTrafficResponse> {
    Json(GetTrafficResponse { traffic: config.traffic.clone() })
}

/// Spin up a target agent that answers `get_open_ports`/`get_traffic` with a
/// canned ground truth and captured traffic trace.
pub async fn spawn_mock_target(config: MockTargetConfig) -> MockAgent {
    let router = Router::new()
        .route("/start_monitor", post(start_monitor))
        .route("/stop_monitor", post(stop_monitor))
        .route("/get_open_ports", post(get_open_ports))
        .route("/get_traffic", post(get_traffic))
        .with_state(config);

    let addr = serve(router).await;
    MockAgent { host: HostRecord::new(addr.ip(), addr.port()), calls: CallCounts::default() }
}

async fn start_snitch() -> Json<Empty> {
    Json(Empty {})
}

async fn stop_snitch() -> Json<Empty> {
    Json(Empty {})
}

async fn snitch_state(State(alerts): State<Arc<Mutex<Vec<Alert>>>>) -> Json<SnitchStateResponse> {
    Json(SnitchStateResponse { alerts: alerts.lock().unwrap().clone() })
}

/// Spin up a firewall agent whose pending alert list can be mutated after
/// the server starts, so a test can "fire" a detection mid-poll.
pub async fn spawn_mock_firewall() -> (MockAgent, Arc<Mutex<Vec<Alert>>>) {
    let alerts = Arc::new(Mutex::new(Vec::new()));

    let router = Router::new()
        .route("/start_snitch", post(start_snitch))
        .route("/stop_snitch", post(stop_snitch))
        .route("/snitch_state", post(snitch_state))
        .with_state(alerts.clone());

    let addr = serve(router).await;
    (MockAgent { host: HostRecord::new(addr.ip(), addr.port()), calls: CallCounts::default() }, alerts)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
