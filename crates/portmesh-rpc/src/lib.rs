//! HTTP RPC transport shared by the coordinator and every agent binary.
//!
//! Message shapes live in [`messages`], the outbound caller in [`client`],
//! and the minimal inbound server plumbing in [`server`]. Every agent
//! assembles its own `axum::Router` from these message types and its own
//! handler functions, then passes the router to [`server::serve`].

pub mod client;
pub mod messages;
pub mod server;

pub use client::{RpcClient, DEFAULT_RPC_TIMEOUT};
pub use server::serve;
