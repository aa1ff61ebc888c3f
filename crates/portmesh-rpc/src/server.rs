//! Shared server plumbing: every agent builds its own `axum::Router` of
//! handlers for the methods it exposes, then hands it to [`serve`].

use std::net::SocketAddr;

use axum::Router;

/// Bind `addr` and serve `router` until the process is killed.
///
/// Agents run this as a background task alongside their own scan/monitor
/// loop; there is no graceful-shutdown signal because the harness expects
/// agents to be torn down by process termination, not by RPC.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "rpc server listening");
    axum::serve(listener, router).await
}
