//! Fuses the three observation streams — scanner-reported port states,
//! scanner-recorded traffic, and target-captured traffic — into an ASR.

use std::net::IpAddr;

use portmesh_core::{PortStateObservation, TrafficObservation};

/// Scan method name that denotes the connect-style probe, whose packet
/// trace carries no sequence number (see the probe-output grammar).
pub const CONNECT_STYLE_METHOD: &str = "connect";

/// Compute the Attacker Success Rate over `ports × targets`.
///
/// `T = |ports| * |targets|`; `ASR = successful / T`, clamped at 1.0.
/// `T = 0` is defined as the vacuous case and reports `ASR = 1.0`.
pub fn compute_asr(
    ports: &[u16],
    targets: &[IpAddr],
    portstate: &PortStateObservation,
    traffic: &TrafficObservation,
    scan_method: &str,
) -> f64 {
    let t = ports.len() * targets.len();
    if t == 0 {
        return 1.0;
    }

    let is_connect_style = scan_method.eq_ignore_ascii_case(CONNECT_STYLE_METHOD);
    let mut successful = 0usize;

    for &target in targets {
        let Some(scanner_states) = portstate.scanners.get(&target) else {
            continue;
        };

        for (&port, (state, scanner)) in scanner_states {
            if !ports.contains(&port) {
                continue;
            }

            let Some(ground_truth) = portstate.targets.get(&target).and_then(|m| m.get(&port)) else {
                continue;
            };
            if state != ground_truth {
                continue;
            }

            let Some(sent) = traffic
                .scanners
                .get(scanner)
                .and_then(|by_target| by_target.get(&target))
                .and_then(|by_port| by_port.get(&port))
            else {
                continue;
            };
            let Some(received) = traffic
                .targets
                .get(&target)
                .and_then(|by_scanner| by_scanner.get(scanner))
                .and_then(|by_port| by_port.get(&port))
            else {
                continue;
            };

            let all_matched = sent.iter().all(|sent_pkt| {
                received.iter().any(|recv_pkt| {
                    if is_connect_style {
                        sent_pkt.flags == recv_pkt.flags
                    } else {
                        sent_pkt.flags == recv_pkt.flags && sent_pkt.seq == recv_pkt.seq
                    }
                })
            });

            if all_matched {
                successful += 1;
            }
        }
    }

    (successful.min(t) as f64) / (t as f64)
}
