//! Axum router exposing the scanner agent's four RPC methods.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use portmesh_rpc::messages::{Empty, ExecScanRequest, PollScanResponse, ScanStateResponse};

use crate::state::ScannerState;

pub fn router(state: Arc<ScannerState>) -> Router {
    Router::new()
        .route("/exec_scan", post(exec_scan))
        .route("/stop_scan", post(stop_scan))
        .route("/poll_scan", post(poll_scan))
        .route("/scan_state", post(scan_state))
        .with_state(state)
}

async fn exec_scan(
    State(state): State<Arc<ScannerState>>,
    Json(req): Json<ExecScanRequest>,
) -> Json<Empty> {
    state.exec_scan(req).await;
    Json(Empty {})
}

async fn stop_scan(State(state): State<Arc<ScannerState>>) -> Json<Empty> {
    state.stop_scan().await;
    Json(Empty {})
}

async fn poll_scan(State(state): State<Arc<ScannerState>>) -> Json<PollScanResponse> {
    Json(PollScanResponse {
        running: state.is_running(),
    })
}

async fn scan_state(State(state): State<Arc<ScannerState>>) -> Json<ScanStateResponse> {
    Json(state.scan_state())
}
