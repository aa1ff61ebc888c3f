//! Event types flowing through the coordinator's event queue

use crate::types::Alert;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// An event reported by an agent via the `add_event` RPC callback
///
/// Scanner and firewall agents are the only event sources; the
/// coordinator is the sole consumer. Variants carry no string tags at
/// runtime, only typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A scanner reports it has finished probing one target
    Scanner { scanner: IpAddr, target: IpAddr },
    /// A firewall reports a detection
    Firewall { alert: Alert },
}

impl Event {
    /// The address of the agent that raised this event
    pub fn source(&self) -> IpAddr {
        match self {
            Event::Scanner { scanner, .. } => *scanner,
            Event::Firewall { alert } => alert.detected_by,
        }
    }
}
