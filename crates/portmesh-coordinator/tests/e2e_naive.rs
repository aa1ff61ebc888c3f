//! End-to-end scenario for the naive distribution strategy: a detected
//! scanner hands off its remaining subparts to the next scanner in line.

mod common;

use portmesh_core::{Alert, FirewallArgsConfig, TimingTemplate};
use portmesh_coordinator::{strategy, ExperimentContext};
use portmesh_rpc::messages::CoordinatorAddr;
use portmesh_rpc::RpcClient;

use common::{spawn_mock_firewall, spawn_mock_scanner, MockScannerConfig};

fn no_firewall_args() -> FirewallArgsConfig {
    FirewallArgsConfig { patterns: vec![], logfile: String::new(), timing: 1.0 }
}

fn coordinator_addr() -> CoordinatorAddr {
    CoordinatorAddr { ip: "127.0.0.1".parse().unwrap(), port: 0 }
}

/// One target, 16 ports (two subparts of 8). Scanner A is flagged by the
/// firewall the moment it's polled, so it only ever works its first
/// subpart; scanner B, never named by an alert, drains the rest.
#[tokio::test]
async fn naive_run_hands_off_remaining_subparts_after_detection() {
    let scanner_a = spawn_mock_scanner(MockScannerConfig {
        poll_running: true,
        ..Default::default()
    })
    .await;
    let scanner_b = spawn_mock_scanner(MockScannerConfig {
        poll_running: false,
        ..Default::default()
    })
    .await;
    let (firewall, alerts) = spawn_mock_firewall().await;

    let target: std::net::IpAddr = "10.0.0.70".parse().unwrap();
    let ports: Vec<u16> = (22000..22016).collect();

    alerts.lock().unwrap().push(Alert {
        patterns: vec!["SCAN".to_string()],
        detected_by: "10.0.0.99".parse().unwrap(),
        ip_src: scanner_a.host.address,
        ip_dst: target,
        date: 1_700_000_000,
    });

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: "naive".to_string(),
        scan_method: "syn".to_string(),
        timing: TimingTemplate::Normal,
        scanners: vec![scanner_a.host, scanner_b.host],
        firewalls: vec![firewall.host],
        targets: vec![portmesh_core::HostRecord::new(target, 0)],
        ports,
        firewall_args: no_firewall_args(),
        coordinator: coordinator_addr(),
    };

    let (_tx, mut rx) = portmesh_core::event_bus::event_queue(16);
    let state = strategy::run(&ctx, &mut rx).await;

    assert!(state.detected.contains(&scanner_a.host.address));
    assert_eq!(state.detected.len(), 1);

    // A is flagged on its very first poll, so it only ever dispatches once.
    assert_eq!(*scanner_a.calls.exec_scan.lock().unwrap(), 1);
    // B drains the one remaining subpart and never sees a detection.
    assert_eq!(*scanner_b.calls.exec_scan.lock().unwrap(), 1);
}
