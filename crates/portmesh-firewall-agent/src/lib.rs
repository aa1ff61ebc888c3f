//! Firewall agent: tails an IDS alert log and reports pattern matches to
//! the coordinator.

pub mod server;
pub mod snitch;
pub mod state;

pub use state::SnitchState;
