//! Axum router exposing the firewall agent's three RPC methods.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use portmesh_rpc::messages::{Empty, SnitchStateResponse, StartSnitchRequest};

use crate::state::SnitchState;

pub fn router(state: Arc<SnitchState>) -> Router {
    Router::new()
        .route("/start_snitch", post(start_snitch))
        .route("/stop_snitch", post(stop_snitch))
        .route("/snitch_state", post(snitch_state))
        .with_state(state)
}

async fn start_snitch(
    State(state): State<Arc<SnitchState>>,
    Json(req): Json<StartSnitchRequest>,
) -> Json<Empty> {
    state.start_snitch(req);
    Json(Empty {})
}

async fn stop_snitch(State(state): State<Arc<SnitchState>>) -> Json<Empty> {
    state.stop_snitch();
    Json(Empty {})
}

async fn snitch_state(State(state): State<Arc<SnitchState>>) -> Json<SnitchStateResponse> {
    Json(state.snitch_state())
}
