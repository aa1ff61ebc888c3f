//! Error types for the portmesh core library

use std::io;
use std::net::AddrParseError;
use thiserror::Error;

/// Result type alias for portmesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared across the coordinator and all agents
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file is missing, malformed, or fails validation
    #[error("configuration error: {0}")]
    Config(String),

    /// A host address could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// A port range specification was malformed
    #[error("invalid port range: {0}")]
    InvalidPortRange(String),

    /// An RPC call failed or timed out
    #[error("rpc error calling {method} on {peer}: {reason}")]
    Rpc {
        method: String,
        peer: String,
        reason: String,
    },

    /// I/O error, converted automatically
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A probe or monitor process failed to start or exited unexpectedly
    #[error("agent process error: {0}")]
    Process(String),

    /// Packet capture or interface error
    #[error("network error: {0}")]
    Network(String),

    /// Insufficient privileges for raw socket/capture access
    #[error("insufficient privileges: {0}")]
    Privilege(String),
}

impl From<AddrParseError> for Error {
    fn from(err: AddrParseError) -> Self {
        Error::Parse(format!("invalid address: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(format!("JSON error: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Rpc {
            method: err.url().map(|u| u.path().to_string()).unwrap_or_default(),
            peer: err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("unknown")
                .to_string(),
            reason: err.to_string(),
        }
    }
}
