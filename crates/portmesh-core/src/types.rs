//! Core data types shared by the coordinator and all agents

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

/// Port range specification, e.g. "80,443,8080-8090"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRange {
    /// Single port
    Single(u16),
    /// Range of ports (inclusive)
    Range(u16, u16),
    /// List of individual ports and ranges
    List(Vec<PortRange>),
}

impl PortRange {
    /// Parse port specification: "80", "1-1000", "80,443,8080", "1-100,443"
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::InvalidPortRange(
                "empty port specification".to_string(),
            ));
        }

        if input.contains(',') {
            let parts: Result<Vec<PortRange>> = input
                .split(',')
                .map(|s| PortRange::parse(s.trim()))
                .collect();
            return Ok(PortRange::List(parts?));
        }

        if input.contains('-') {
            let parts: Vec<&str> = input.split('-').collect();
            if parts.len() != 2 {
                return Err(Error::InvalidPortRange(format!(
                    "invalid range format: {input}"
                )));
            }

            let start: u16 = parts[0]
                .trim()
                .parse()
                .map_err(|_| Error::InvalidPortRange(format!("invalid port number: {}", parts[0])))?;
            let end: u16 = parts[1]
                .trim()
                .parse()
                .map_err(|_| Error::InvalidPortRange(format!("invalid port number: {}", parts[1])))?;

            if start == 0 || end == 0 {
                return Err(Error::InvalidPortRange("port 0 is invalid".to_string()));
            }
            if end < start {
                return Err(Error::InvalidPortRange(format!(
                    "end port {end} < start port {start}"
                )));
            }

            return Ok(PortRange::Range(start, end));
        }

        let port: u16 = input
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPortRange(format!("invalid port number: {input}")))?;

        if port == 0 {
            return Err(Error::InvalidPortRange("port 0 is invalid".to_string()));
        }

        Ok(PortRange::Single(port))
    }

    /// Iterator over all ports named by this range
    pub fn iter(&self) -> PortRangeIterator {
        PortRangeIterator::new(self.clone())
    }

    /// Total number of ports named by this range
    pub fn count(&self) -> usize {
        match self {
            PortRange::Single(_) => 1,
            PortRange::Range(start, end) => *end as usize - *start as usize + 1,
            PortRange::List(ranges) => ranges.iter().map(|r| r.count()).sum(),
        }
    }

    /// Flatten into a plain `Vec<u16>`
    pub fn to_vec(&self) -> Vec<u16> {
        self.iter().collect()
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRange::Single(port) => write!(f, "{port}"),
            PortRange::Range(start, end) => write!(f, "{start}-{end}"),
            PortRange::List(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Iterator over the ports named by a [`PortRange`]
pub struct PortRangeIterator {
    ranges: Vec<PortRange>,
    current_range_idx: usize,
    current_port: u16,
}

impl PortRangeIterator {
    fn new(range: PortRange) -> Self {
        let ranges = match range {
            PortRange::List(list) => list,
            single => vec![single],
        };

        let current_port = match ranges.first() {
            Some(PortRange::Single(p)) => *p,
            Some(PortRange::Range(start, _)) => *start,
            Some(PortRange::List(_)) => unreachable!(),
            None => 0,
        };

        Self {
            ranges,
            current_range_idx: 0,
            current_port,
        }
    }
}

impl Iterator for PortRangeIterator {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_range_idx >= self.ranges.len() {
            return None;
        }

        let current_range = &self.ranges[self.current_range_idx];

        match current_range {
            PortRange::Single(port) => {
                let port = *port;
                self.current_range_idx += 1;
                if let Some(next_range) = self.ranges.get(self.current_range_idx) {
                    match next_range {
                        PortRange::Single(p) => self.current_port = *p,
                        PortRange::Range(start, _) => self.current_port = *start,
                        PortRange::List(_) => {}
                    }
                }
                Some(port)
            }
            PortRange::Range(_, end) => {
                if self.current_port > *end {
                    self.current_range_idx += 1;
                    if let Some(next_range) = self.ranges.get(self.current_range_idx) {
                        match next_range {
                            PortRange::Single(p) => self.current_port = *p,
                            PortRange::Range(start, _) => self.current_port = *start,
                            PortRange::List(_) => {}
                        }
                        return self.next();
                    }
                    return None;
                }

                let port = self.current_port;
                self.current_port += 1;
                Some(port)
            }
            PortRange::List(_) => unreachable!("lists are flattened at construction"),
        }
    }
}

/// Observed or reported state of a single port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// Port accepted a connection
    Open,
    /// Port actively refused a connection (RST)
    Closed,
    /// No response, or silently dropped (treated as closed for ASR purposes)
    Filtered,
    /// State could not be parsed from probe output
    Unknown,
}

impl PortState {
    /// Parse a probe's reported state, discarding anything after a `|`
    /// separator the way the scan-method handler does before storage.
    pub fn parse_probe_state(raw: &str) -> Self {
        let head = raw.split('|').next().unwrap_or(raw).trim();
        match head {
            "open" => PortState::Open,
            "closed" => PortState::Closed,
            "filtered" => PortState::Filtered,
            _ => PortState::Unknown,
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Open => write!(f, "open"),
            PortState::Closed => write!(f, "closed"),
            PortState::Filtered => write!(f, "filtered"),
            PortState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Timing template controlling probe aggressiveness, mirroring nmap's T0-T5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingTemplate {
    Paranoid,
    Sneaky,
    Polite,
    Normal,
    Aggressive,
    Insane,
}

impl TimingTemplate {
    /// Numeric argument passed to the probe command's `-T` flag
    pub fn as_probe_arg(&self) -> &'static str {
        match self {
            TimingTemplate::Paranoid => "0",
            TimingTemplate::Sneaky => "1",
            TimingTemplate::Polite => "2",
            TimingTemplate::Normal => "3",
            TimingTemplate::Aggressive => "4",
            TimingTemplate::Insane => "5",
        }
    }

    /// Parse the lowercase name used in experiment config files
    pub fn parse(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "paranoid" => Ok(TimingTemplate::Paranoid),
            "sneaky" => Ok(TimingTemplate::Sneaky),
            "polite" => Ok(TimingTemplate::Polite),
            "normal" => Ok(TimingTemplate::Normal),
            "aggressive" => Ok(TimingTemplate::Aggressive),
            "insane" => Ok(TimingTemplate::Insane),
            other => Err(Error::Config(format!("unknown timing template: {other}"))),
        }
    }
}

impl fmt::Display for TimingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingTemplate::Paranoid => write!(f, "paranoid"),
            TimingTemplate::Sneaky => write!(f, "sneaky"),
            TimingTemplate::Polite => write!(f, "polite"),
            TimingTemplate::Normal => write!(f, "normal"),
            TimingTemplate::Aggressive => write!(f, "aggressive"),
            TimingTemplate::Insane => write!(f, "insane"),
        }
    }
}

/// A host participating in an experiment, identified by address and the
/// RPC port its agent listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostRecord {
    pub address: IpAddr,
    pub port: u16,
}

impl HostRecord {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A unit of work handed to a single scanner for a single target:
/// one target host and the set of ports it must probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subpart {
    pub target: IpAddr,
    pub ports: Vec<u16>,
}

/// A single packet observed by a scanner or a target, reduced to the
/// fields the fusion layer cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pkt {
    /// TCP flag string, e.g. "S", "SA", "R"
    pub flags: String,
    /// Sequence number, absent for connect-style scans
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seq: Option<u32>,
}

impl Pkt {
    pub fn new(flags: impl Into<String>) -> Self {
        Self {
            flags: flags.into(),
            seq: None,
        }
    }

    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = Some(seq);
        self
    }
}

/// Port states as reported by scanners and as observed directly on targets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortStateObservation {
    /// target -> port -> ground-truth state (as read from the target)
    pub targets: HashMap<IpAddr, HashMap<u16, PortState>>,
    /// target -> port -> (state, scanner address) as reported by scanners
    pub scanners: HashMap<IpAddr, HashMap<u16, (PortState, IpAddr)>>,
}

/// Packet-level traffic observed by scanners and by targets, keyed
/// consistently by `[peer][target][port]` on both sides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficObservation {
    /// scanner -> target -> port -> packets the scanner reports sending/receiving
    pub scanners: HashMap<IpAddr, HashMap<IpAddr, HashMap<u16, Vec<Pkt>>>>,
    /// target -> scanner -> port -> packets the target captured
    pub targets: HashMap<IpAddr, HashMap<IpAddr, HashMap<u16, Vec<Pkt>>>>,
}

impl TrafficObservation {
    /// Record scanner-side traffic, keying by `[scanner][target][port]`
    pub fn record_scanner(&mut self, scanner: IpAddr, target: IpAddr, port: u16, pkt: Pkt) {
        self.scanners
            .entry(scanner)
            .or_default()
            .entry(target)
            .or_default()
            .entry(port)
            .or_default()
            .push(pkt);
    }

    /// Record target-side traffic, keying by `[target][scanner][port]`
    pub fn record_target(&mut self, target: IpAddr, scanner: IpAddr, port: u16, pkt: Pkt) {
        self.targets
            .entry(target)
            .or_default()
            .entry(scanner)
            .or_default()
            .entry(port)
            .or_default()
            .push(pkt);
    }
}

/// A firewall/IDS alert parsed from a log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub patterns: Vec<String>,
    pub detected_by: IpAddr,
    pub ip_src: IpAddr,
    pub ip_dst: IpAddr,
    /// Epoch seconds, synthesized from the log timestamp and the local year
    pub date: i64,
}

/// Set of scanner addresses a firewall has flagged as detected
pub type DetectedSet = HashSet<IpAddr>;
