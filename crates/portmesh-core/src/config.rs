//! Experiment configuration loading and validation

use crate::error::{Error, Result};
use crate::types::{HostRecord, PortRange, TimingTemplate};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

/// Top-level experiment configuration, loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub hosts: HostsConfig,
    pub experiments: ExperimentsConfig,
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {path:?}: {e}")))?;
        Self::load_from_str(&contents)
    }

    /// Load and validate configuration from a JSON string
    pub fn load_from_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        let config = raw.expand()?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation beyond what JSON deserialization already enforces
    pub fn validate(&self) -> Result<()> {
        if self.hosts.scanners.is_empty() {
            return Err(Error::Config("hosts.scanners must not be empty".to_string()));
        }
        if self.hosts.targets.is_empty() {
            return Err(Error::Config("hosts.targets must not be empty".to_string()));
        }

        for method in &self.experiments.distribution_methods {
            if method != "naive" && method != "parallel" {
                return Err(Error::Config(format!(
                    "unrecognized distribution method: {method}"
                )));
            }
        }

        if self.experiments.distribution_methods.is_empty() {
            return Err(Error::Config(
                "experiments.distributionMethods must not be empty".to_string(),
            ));
        }
        if self.experiments.scan_methods.is_empty() {
            return Err(Error::Config(
                "experiments.scanMethods must not be empty".to_string(),
            ));
        }
        if self.experiments.scan_timings.is_empty() {
            return Err(Error::Config(
                "experiments.scanTimings must not be empty".to_string(),
            ));
        }

        for &count in &self.experiments.scanner_number_values {
            if count > self.hosts.scanners.len() {
                return Err(Error::Config(format!(
                    "scannerNumberValues entry {count} exceeds configured scanner pool size {}",
                    self.hosts.scanners.len()
                )));
            }
        }
        for &count in &self.experiments.target_number_values {
            if count > self.hosts.targets.len() {
                return Err(Error::Config(format!(
                    "targetNumberValues entry {count} exceeds configured target pool size {}",
                    self.hosts.targets.len()
                )));
            }
        }

        if self.experiments.count == 0 {
            return Err(Error::Config("experiments.count must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// `hosts` section: pools of agent addresses, expanded from config ranges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostsConfig {
    pub scanners: Vec<HostRecord>,
    pub firewalls: Vec<HostRecord>,
    pub targets: Vec<HostRecord>,
}

/// `experiments` section: the cross-product driving the experiment matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentsConfig {
    #[serde(rename = "distributionMethods")]
    pub distribution_methods: Vec<String>,
    #[serde(rename = "scanMethods")]
    pub scan_methods: Vec<String>,
    #[serde(rename = "scanTimings")]
    pub scan_timings: Vec<TimingTemplate>,
    #[serde(rename = "scannerNumberValues")]
    pub scanner_number_values: Vec<usize>,
    #[serde(rename = "targetNumberValues")]
    pub target_number_values: Vec<usize>,
    pub count: usize,
    #[serde(with = "port_range_serde")]
    pub ports: PortRange,
    pub firewall_args: FirewallArgsConfig,
}

/// `experiments.firewall_args`: patterns/log path/poll interval handed to
/// `start_snitch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallArgsConfig {
    pub patterns: Vec<String>,
    pub logfile: String,
    /// Poll interval in seconds
    pub timing: f64,
}

mod port_range_serde {
    use super::PortRange;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(range: &PortRange, s: S) -> Result<S::Ok, S::Error> {
        range.to_string().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PortRange, D::Error> {
        let raw = String::deserialize(d)?;
        PortRange::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Pre-expansion shape of the config file: `hosts.*` entries still carry
/// the raw `{ip, port}` pairs, where `ip` may be a compact range
#[derive(Debug, Deserialize)]
struct RawConfig {
    hosts: RawHosts,
    experiments: ExperimentsConfig,
}

#[derive(Debug, Deserialize)]
struct RawHosts {
    #[serde(default)]
    scanners: Vec<RawHostEntry>,
    #[serde(default)]
    firewalls: Vec<RawHostEntry>,
    #[serde(default)]
    targets: Vec<RawHostEntry>,
}

#[derive(Debug, Deserialize)]
struct RawHostEntry {
    ip: String,
    port: u16,
}

impl RawConfig {
    fn expand(self) -> Result<Config> {
        Ok(Config {
            hosts: HostsConfig {
                scanners: expand_entries(&self.hosts.scanners)?,
                firewalls: expand_entries(&self.hosts.firewalls)?,
                targets: expand_entries(&self.hosts.targets)?,
            },
            experiments: self.experiments,
        })
    }
}

fn expand_entries(entries: &[RawHostEntry]) -> Result<Vec<HostRecord>> {
    let mut records = Vec::new();
    for entry in entries {
        for address in expand_ip_spec(&entry.ip)? {
            records.push(HostRecord::new(address, entry.port));
        }
    }
    Ok(records)
}

/// Expand a host `ip` field, which is either a plain address or the
/// compact range syntax `A.B.C.x-y` naming a span of the last octet
fn expand_ip_spec(spec: &str) -> Result<Vec<IpAddr>> {
    if let Ok(addr) = spec.parse::<IpAddr>() {
        return Ok(vec![addr]);
    }

    let octets: Vec<&str> = spec.split('.').collect();
    if octets.len() != 4 {
        return Err(Error::Config(format!("invalid host address: {spec}")));
    }

    let (lo, hi) = octets[3]
        .split_once('-')
        .ok_or_else(|| Error::Config(format!("invalid host address: {spec}")))?;
    let lo: u8 = lo
        .parse()
        .map_err(|_| Error::Config(format!("invalid host address: {spec}")))?;
    let hi: u8 = hi
        .parse()
        .map_err(|_| Error::Config(format!("invalid host address: {spec}")))?;
    if hi < lo {
        return Err(Error::Config(format!(
            "invalid host address range: {spec} (end < start)"
        )));
    }

    let a: u8 = octets[0]
        .parse()
        .map_err(|_| Error::Config(format!("invalid host address: {spec}")))?;
    let b: u8 = octets[1]
        .parse()
        .map_err(|_| Error::Config(format!("invalid host address: {spec}")))?;
    let c: u8 = octets[2]
        .parse()
        .map_err(|_| Error::Config(format!("invalid host address: {spec}")))?;

    Ok((lo..=hi)
        .map(|d| IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "hosts": {
                "scanners": [{"ip": "10.0.0.10-12", "port": 9001}],
                "firewalls": [{"ip": "10.0.0.20", "port": 9002}],
                "targets": [{"ip": "10.0.0.30", "port": 9003}]
            },
            "experiments": {
                "distributionMethods": ["naive", "parallel"],
                "scanMethods": ["syn"],
                "scanTimings": ["normal", "aggressive"],
                "scannerNumberValues": [1, 2],
                "targetNumberValues": [1],
                "count": 3,
                "ports": "22,80,443",
                "firewall_args": {
                    "patterns": ["SCAN"],
                    "logfile": "/var/log/snort/alert",
                    "timing": 0.5
                }
            }
        }"#
    }

    #[test]
    fn test_load_from_str_expands_host_range() {
        let config = Config::load_from_str(sample_json()).unwrap();
        assert_eq!(config.hosts.scanners.len(), 3);
        assert_eq!(
            config.hosts.scanners[0].address,
            "10.0.0.10".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            config.hosts.scanners[2].address,
            "10.0.0.12".parse::<IpAddr>().unwrap()
        );
        assert!(config.hosts.scanners.iter().all(|h| h.port == 9001));
    }

    #[test]
    fn test_load_from_str_parses_ports() {
        let config = Config::load_from_str(sample_json()).unwrap();
        assert_eq!(config.experiments.ports.count(), 3);
    }

    #[test]
    fn test_validate_rejects_unknown_distribution_method() {
        let bad = sample_json().replace("\"naive\", \"parallel\"", "\"quantum\"");
        assert!(Config::load_from_str(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_scanner_count_exceeding_pool() {
        let bad = sample_json().replace("\"scannerNumberValues\": [1, 2]", "\"scannerNumberValues\": [50]");
        assert!(Config::load_from_str(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_scanners() {
        let bad = sample_json().replace(
            r#""scanners": [{"ip": "10.0.0.10-12", "port": 9001}]"#,
            r#""scanners": []"#,
        );
        assert!(Config::load_from_str(&bad).is_err());
    }

    #[test]
    fn test_expand_ip_spec_single_address() {
        let addrs = expand_ip_spec("10.0.0.5").unwrap();
        assert_eq!(addrs, vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn test_expand_ip_spec_range() {
        let addrs = expand_ip_spec("192.168.1.1-3").unwrap();
        assert_eq!(addrs.len(), 3);
    }

    #[test]
    fn test_expand_ip_spec_invalid_range() {
        assert!(expand_ip_spec("192.168.1.5-2").is_err());
        assert!(expand_ip_spec("not.an.ip.spec").is_err());
    }
}
