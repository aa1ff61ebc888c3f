//! Target agent: passively sniffs traffic from configured scanner addresses
//! and reports its listening TCP ports.

pub mod packet;
pub mod proc_net;
pub mod server;
pub mod state;

pub use state::MonitorState;
