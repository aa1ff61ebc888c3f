//! Core types, configuration, and error handling shared by the portmesh
//! coordinator and its agents.
//!
//! # Examples
//!
//! ```
//! use portmesh_core::{PortRange, TimingTemplate};
//!
//! let ports = PortRange::parse("80,443,8080-8090").unwrap();
//! assert_eq!(ports.count(), 13);
//!
//! let timing = TimingTemplate::parse("aggressive").unwrap();
//! assert_eq!(timing.as_probe_arg(), "4");
//! ```

pub mod config;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod types;

pub use config::{Config, ExperimentsConfig, FirewallArgsConfig, HostsConfig};
pub use error::{Error, Result};
pub use event_bus::{event_queue, EventReceiver, EventSender, DEFAULT_QUEUE_CAPACITY};
pub use events::Event;
pub use types::{
    Alert, DetectedSet, HostRecord, Pkt, PortRange, PortState, PortStateObservation, Subpart,
    TimingTemplate, TrafficObservation,
};
