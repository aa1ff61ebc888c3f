//! Cross-platform packet capture and privilege management
//!
//! Used by the target agent's passive sniffer; the scanner and firewall
//! agents never touch raw sockets.
//!
//! # Examples
//!
//! ```no_run
//! use portmesh_network::{capture::create_capture, check_privileges};
//!
//! check_privileges().expect("insufficient privileges");
//!
//! let mut capture = create_capture().unwrap();
//! capture.open(Some("eth0")).unwrap();
//!
//! if let Some(received) = capture.receive_packet(1000).unwrap() {
//!     println!("received {} bytes", received.len());
//! }
//!
//! capture.close().unwrap();
//! ```

pub mod capture;
pub mod interface;
pub mod privilege;

pub use capture::{create_capture, PacketCapture};
pub use interface::{enumerate_interfaces, find_interface_by_name, get_source_ip_for_target, NetworkInterface};
pub use privilege::{check_privileges, drop_privileges, has_raw_socket_capability};
