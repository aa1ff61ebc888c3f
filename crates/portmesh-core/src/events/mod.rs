//! Event types exchanged between agents and the coordinator

mod types;

pub use types::Event;
