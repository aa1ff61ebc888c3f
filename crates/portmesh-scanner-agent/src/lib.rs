//! Scanner agent: spawns a probe process per `exec_scan` call, parses its
//! packet-trace output, and serves the results over RPC.

pub mod probe;
pub mod server;
pub mod state;

pub use state::ScannerState;
