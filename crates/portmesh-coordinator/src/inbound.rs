//! The coordinator's own RPC endpoint: the one route agents call back on
//! (`add_event`), bound to an ephemeral port for the lifetime of a single
//! experiment.

use std::net::{IpAddr, SocketAddr};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use portmesh_core::event_bus::{event_queue, EventReceiver, EventSender, DEFAULT_QUEUE_CAPACITY};
use portmesh_rpc::messages::{AddEventRequest, CoordinatorAddr, Empty};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running `add_event` listener plus the address agents should be told
/// to report to.
pub struct InboundEndpoint {
    pub addr: CoordinatorAddr,
    handle: JoinHandle<()>,
}

impl InboundEndpoint {
    /// Bind an ephemeral port on `bind_ip` and start serving `add_event`.
    pub async fn start(bind_ip: IpAddr) -> std::io::Result<(Self, EventReceiver)> {
        let (tx, rx) = event_queue(DEFAULT_QUEUE_CAPACITY);
        let listener = TcpListener::bind(SocketAddr::new(bind_ip, 0)).await?;
        let local_addr = listener.local_addr()?;

        let router = Router::new()
            .route("/add_event", post(handle_add_event))
            .with_state(tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "inbound event endpoint crashed");
            }
        });

        let addr = CoordinatorAddr {
            ip: local_addr.ip(),
            port: local_addr.port(),
        };
        tracing::debug!(ip = %addr.ip, port = addr.port, "inbound event endpoint listening");

        Ok((Self { addr, handle }, rx))
    }

    /// Tear down the listener once an experiment has finished.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

async fn handle_add_event(
    State(tx): State<EventSender>,
    Json(req): Json<AddEventRequest>,
) -> Json<Empty> {
    tx.send(req.event).await;
    Json(Empty {})
}
