//! Reads the kernel's TCP socket table to find locally listening ports.

use std::path::Path;

/// State code for a listening socket in `/proc/net/tcp`.
const LISTEN_STATE: &str = "0A";
/// Wildcard local address (`0.0.0.0`) in `/proc/net/tcp`'s hex encoding.
const WILDCARD_ADDR: &str = "00000000";

/// Parse `/proc/net/tcp`-formatted content, returning every port with a
/// listening socket bound to the wildcard address.
///
/// Rows that are too short or don't parse as expected are skipped rather
/// than aborting the whole read.
pub fn parse_listening_ports(content: &str) -> Vec<u16> {
    let mut ports = Vec::new();

    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }

        if fields[3] != LISTEN_STATE {
            continue;
        }

        let Some((host, port_hex)) = fields[1].split_once(':') else {
            continue;
        };
        if host != WILDCARD_ADDR {
            continue;
        }

        if let Ok(port) = u16::from_str_radix(port_hex, 16) {
            ports.push(port);
        }
    }

    ports
}

/// Read and parse the live kernel TCP socket table. Missing or unreadable
/// files yield an empty list rather than an error, since "no open ports
/// reported" is a valid degraded state for the fusion pipeline.
pub fn read_listening_ports(path: &Path) -> Vec<u16> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_listening_ports(&content),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read tcp socket table");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n   0: 00000000:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345 1 0000000000000000 100 0 0 10 0\n   1: 0100007F:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12346 1 0000000000000000 100 0 0 10 0\n   2: 0100007F:1F90 0100007F:C350 01 00000000:00000000 00:00000000 00000000     0        0 12347 1 0000000000000000 100 0 0 10 0\n";

    #[test]
    fn test_parse_listening_ports_keeps_only_wildcard_listeners() {
        let ports = parse_listening_ports(SAMPLE);
        assert_eq!(ports, vec![80]);
    }

    #[test]
    fn test_parse_listening_ports_ignores_established_connections() {
        let ports = parse_listening_ports(SAMPLE);
        assert!(!ports.contains(&8080));
    }

    #[test]
    fn test_parse_listening_ports_empty_on_header_only_input() {
        assert!(parse_listening_ports("sl local_address rem_address st\n").is_empty());
    }
}
