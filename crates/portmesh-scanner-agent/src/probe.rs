//! Builds the probe process invocation and parses its packet-trace output.
//!
//! The probe binary itself is an external collaborator (out of scope); this
//! module only assumes it accepts an nmap-style packet-trace invocation and
//! prints SENT/RCVD/CONN/Discovered lines on stdout.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use portmesh_core::{Pkt, PortState, TimingTemplate};
use regex::Regex;

static TCP_SENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"SENT.*TCP (?P<ip_src>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port_src>\d{1,5}) > (?P<ip_dst>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port_dst>\d{1,5}) (?P<flags>\w*).*seq=(?P<seq>\d+)",
    )
    .expect("static regex is valid")
});

static TCP_RCVD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"RCVD.*TCP (?P<ip_src>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port_src>\d{1,5}) > (?P<ip_dst>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port_dst>\d{1,5}) (?P<flags>\w*).*seq=(?P<seq>\d+)",
    )
    .expect("static regex is valid")
});

static CONN_SENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"CONN.*?(?P<ip_dst>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(?P<port_dst>\d{1,5})",
    )
    .expect("static regex is valid")
});

static PORT_STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Discovered (?P<state>\S+) port (?P<port>\d+)\S* on (?P<ip>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
    )
    .expect("static regex is valid")
});

/// One fact extracted from a single line of probe output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeLine {
    Sent { ip_dst: IpAddr, port_dst: u16, pkt: Pkt },
    Rcvd { ip_src: IpAddr, port_src: u16, pkt: Pkt },
    PortState { port: u16, state: PortState },
}

/// Match a line of probe stdout against the three recognized families.
///
/// Lines that match none of them are dropped silently, per the protocol's
/// parse-failure policy.
pub fn parse_line(line: &str) -> Option<ProbeLine> {
    if let Some(caps) = TCP_SENT_RE.captures(line) {
        return Some(ProbeLine::Sent {
            ip_dst: caps.name("ip_dst")?.as_str().parse().ok()?,
            port_dst: caps.name("port_dst")?.as_str().parse().ok()?,
            pkt: Pkt::new(caps.name("flags").map(|m| m.as_str()).unwrap_or(""))
                .with_seq(caps.name("seq")?.as_str().parse().ok()?),
        });
    }
    if let Some(caps) = TCP_RCVD_RE.captures(line) {
        return Some(ProbeLine::Rcvd {
            ip_src: caps.name("ip_src")?.as_str().parse().ok()?,
            port_src: caps.name("port_src")?.as_str().parse().ok()?,
            pkt: Pkt::new(caps.name("flags").map(|m| m.as_str()).unwrap_or(""))
                .with_seq(caps.name("seq")?.as_str().parse().ok()?),
        });
    }
    if let Some(caps) = CONN_SENT_RE.captures(line) {
        return Some(ProbeLine::Sent {
            ip_dst: caps.name("ip_dst")?.as_str().parse().ok()?,
            port_dst: caps.name("port_dst")?.as_str().parse().ok()?,
            pkt: Pkt::new("S"),
        });
    }
    if let Some(caps) = PORT_STATE_RE.captures(line) {
        let raw_state = caps.name("state")?.as_str();
        return Some(ProbeLine::PortState {
            port: caps.name("port")?.as_str().parse().ok()?,
            state: PortState::parse_probe_state(raw_state),
        });
    }
    None
}

/// Build the probe invocation: `nmap <method> <target> -p <ports> -T <timing>
/// -d2 -Pn -n --packet-trace -oX <logfile>`
pub fn build_command(
    method: &str,
    timing: TimingTemplate,
    target: IpAddr,
    ports: &[u16],
    logfile: &str,
) -> tokio::process::Command {
    let port_list = ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut cmd = tokio::process::Command::new("nmap");
    cmd.arg(method)
        .arg(target.to_string())
        .arg("-p")
        .arg(port_list)
        .arg("-T")
        .arg(timing.as_probe_arg())
        .arg("-d2")
        .arg("-Pn")
        .arg("-n")
        .arg("--packet-trace")
        .arg("-oX")
        .arg(logfile);
    cmd
}

/// A timestamped log filename for the probe's own XML output, mirroring the
/// original tool's `<method>_<day-hour>.xml` naming.
pub fn logfile_name(method: &str) -> String {
    let stamp = chrono::Local::now().format("%d-%m-%y_%H-%M-%S");
    let slug: String = method
        .trim_start_matches('-')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("/tmp/portmesh-scan-{}_{}.xml", slug.to_lowercase(), stamp)
}
