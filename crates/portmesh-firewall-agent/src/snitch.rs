//! Parses multi-line IDS alert records and matches them against configured
//! detection patterns.

use std::net::IpAddr;

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use portmesh_core::Alert;
use regex::Regex;

static ALERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\*\*\] \[.*?\] (?P<alert>.*) \[\*\*\]\n.*\n(?P<month>\d{2})/(?P<day>\d{2})-(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})\.\d+ (?P<ip_src>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}) -> (?P<ip_dst>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\n",
    )
    .expect("static regex is valid")
});

/// Scan `text` for alert records, matching each against `patterns`
/// (case-insensitive substring). Records matching no pattern are dropped.
/// The alert date carries no year, so the current local year is assumed.
pub fn parse_alerts(text: &str, patterns: &[String], detected_by: IpAddr) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let year = Local::now().year();

    for caps in ALERT_RE.captures_iter(text) {
        let alert_text = &caps["alert"];

        let matching: Vec<String> = patterns
            .iter()
            .filter(|p| alert_text.to_lowercase().contains(&p.to_lowercase()))
            .cloned()
            .collect();

        if matching.is_empty() {
            continue;
        }

        let Some(date) = synthesize_timestamp(&caps, year) else {
            continue;
        };
        let Ok(ip_src) = caps["ip_src"].parse() else {
            continue;
        };
        let Ok(ip_dst) = caps["ip_dst"].parse() else {
            continue;
        };

        alerts.push(Alert {
            patterns: matching,
            detected_by,
            ip_src,
            ip_dst,
            date,
        });
    }

    alerts
}

fn synthesize_timestamp(caps: &regex::Captures<'_>, year: i32) -> Option<i64> {
    let month: u32 = caps["month"].parse().ok()?;
    let day: u32 = caps["day"].parse().ok()?;
    let hour: u32 = caps["hour"].parse().ok()?;
    let minute: u32 = caps["minute"].parse().ok()?;
    let second: u32 = caps["second"].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, second)?;
    let local = Local.from_local_datetime(&naive).single()?;
    Some(local.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[**] [1:1000001:1] PORTSCAN DETECTED [**]\nClassification: Attempted Information Leak\n07/30-14:22:10.512340 10.0.0.5 -> 10.0.0.2\n";

    #[test]
    fn test_parse_alerts_matches_configured_pattern() {
        let alerts = parse_alerts(SAMPLE, &["portscan".to_string()], "10.0.0.9".parse().unwrap());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].ip_src, "10.0.0.5".parse::<IpAddr>().unwrap());
        assert_eq!(alerts[0].ip_dst, "10.0.0.2".parse::<IpAddr>().unwrap());
        assert_eq!(alerts[0].patterns, vec!["portscan".to_string()]);
    }

    #[test]
    fn test_parse_alerts_drops_non_matching_pattern() {
        let alerts = parse_alerts(SAMPLE, &["sql injection".to_string()], "10.0.0.9".parse().unwrap());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_parse_alerts_is_case_insensitive() {
        let alerts = parse_alerts(SAMPLE, &["PORTSCAN".to_string()], "10.0.0.9".parse().unwrap());
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_malformed_record_is_dropped_silently() {
        let alerts = parse_alerts("not an alert at all\n", &["portscan".to_string()], "10.0.0.9".parse().unwrap());
        assert!(alerts.is_empty());
    }
}
