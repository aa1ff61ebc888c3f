//! Axum router exposing the target agent's four RPC methods.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use portmesh_rpc::messages::{Empty, GetOpenPortsResponse, GetTrafficResponse, StartMonitorRequest};

use crate::state::MonitorState;

pub fn router(state: Arc<MonitorState>) -> Router {
    Router::new()
        .route("/start_monitor", post(start_monitor))
        .route("/stop_monitor", post(stop_monitor))
        .route("/get_traffic", post(get_traffic))
        .route("/get_open_ports", post(get_open_ports))
        .with_state(state)
}

async fn start_monitor(
    State(state): State<Arc<MonitorState>>,
    Json(req): Json<StartMonitorRequest>,
) -> Json<Empty> {
    state.start_monitor(req.scanner_ips);
    Json(Empty {})
}

async fn stop_monitor(State(state): State<Arc<MonitorState>>) -> Json<Empty> {
    state.stop_monitor();
    Json(Empty {})
}

async fn get_traffic(State(state): State<Arc<MonitorState>>) -> Json<GetTrafficResponse> {
    Json(state.get_traffic())
}

async fn get_open_ports(State(state): State<Arc<MonitorState>>) -> Json<GetOpenPortsResponse> {
    Json(state.get_open_ports())
}
