//! End-to-end fusion scenarios driven over real HTTP against mock agents:
//! dispatch a scan through `strategy::run`, then fuse observations through
//! `ExperimentState::finalize` and check the resulting ASR.

mod common;

use std::collections::HashMap;
use std::net::IpAddr;

use portmesh_core::event_bus::event_queue;
use portmesh_core::{Event, FirewallArgsConfig, Pkt, PortState, TimingTemplate};
use portmesh_coordinator::{strategy, ExperimentContext};
use portmesh_rpc::messages::CoordinatorAddr;
use portmesh_rpc::RpcClient;

use common::{spawn_mock_scanner, spawn_mock_target, MockScannerConfig, MockTargetConfig};

fn no_firewall_args() -> FirewallArgsConfig {
    FirewallArgsConfig { patterns: vec![], logfile: String::new(), timing: 1.0 }
}

fn coordinator_addr() -> CoordinatorAddr {
    CoordinatorAddr { ip: "127.0.0.1".parse().unwrap(), port: 0 }
}

/// Scenario 1: two ports, one target, one scanner, no detection -> ASR 1.0.
#[tokio::test]
async fn scenario_1_clean_scan_yields_full_asr() {
    let mut portstate = HashMap::new();
    portstate.insert(22, PortState::Open);
    portstate.insert(80, PortState::Closed);
    let mut traffic = HashMap::new();
    traffic.insert(22, vec![Pkt::new("S")]);
    traffic.insert(80, vec![Pkt::new("S")]);

    let scanner = spawn_mock_scanner(MockScannerConfig { portstate, traffic }).await;

    let mut target_traffic: HashMap<IpAddr, HashMap<u16, Vec<Pkt>>> = HashMap::new();
    target_traffic.insert(scanner.host.address, HashMap::from([(22, vec![Pkt::new("S")]), (80, vec![Pkt::new("S")])]));
    let target = spawn_mock_target(MockTargetConfig { open_ports: vec![22], traffic: target_traffic }).await;

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: "parallel".to_string(),
        scan_method: "connect".to_string(),
        timing: TimingTemplate::Normal,
        scanners: vec![scanner.host],
        firewalls: vec![],
        targets: vec![target.host],
        ports: vec![22, 80],
        firewall_args: no_firewall_args(),
        coordinator: coordinator_addr(),
    };

    let (tx, mut rx) = event_queue(16);
    tx.send(Event::Scanner { scanner: scanner.host.address, target: target.host.address }).await;

    let mut state = strategy::run(&ctx, &mut rx).await;
    let asr = state.finalize(&ctx).await;

    assert_eq!(asr, 1.0);
    assert_eq!(*scanner.calls.exec_scan.lock().unwrap(), 1);
}

/// Scenario 2: scanner misclassifies one port -> ASR 0.5.
#[tokio::test]
async fn scenario_2_classification_mismatch_halves_asr() {
    let mut portstate = HashMap::new();
    portstate.insert(22, PortState::Open);
    // Misreport: ground truth for 80 will be closed, scanner says open.
    portstate.insert(80, PortState::Open);
    let mut traffic = HashMap::new();
    traffic.insert(22, vec![Pkt::new("S")]);
    traffic.insert(80, vec![Pkt::new("S")]);

    let scanner = spawn_mock_scanner(MockScannerConfig { portstate, traffic }).await;

    let mut target_traffic: HashMap<IpAddr, HashMap<u16, Vec<Pkt>>> = HashMap::new();
    target_traffic.insert(scanner.host.address, HashMap::from([(22, vec![Pkt::new("S")]), (80, vec![Pkt::new("S")])]));
    let target = spawn_mock_target(MockTargetConfig { open_ports: vec![22], traffic: target_traffic }).await;

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: "parallel".to_string(),
        scan_method: "connect".to_string(),
        timing: TimingTemplate::Normal,
        scanners: vec![scanner.host],
        firewalls: vec![],
        targets: vec![target.host],
        ports: vec![22, 80],
        firewall_args: no_firewall_args(),
        coordinator: coordinator_addr(),
    };

    let (tx, mut rx) = event_queue(16);
    tx.send(Event::Scanner { scanner: scanner.host.address, target: target.host.address }).await;

    let mut state = strategy::run(&ctx, &mut rx).await;
    let asr = state.finalize(&ctx).await;

    assert_eq!(asr, 0.5);
}

/// Scenario 3: target's capture map is missing one port's traffic -> ASR 0.5.
#[tokio::test]
async fn scenario_3_missing_target_capture_disqualifies_port() {
    let mut portstate = HashMap::new();
    portstate.insert(22, PortState::Open);
    portstate.insert(80, PortState::Closed);
    let mut traffic = HashMap::new();
    traffic.insert(22, vec![Pkt::new("S")]);
    traffic.insert(80, vec![Pkt::new("S")]);

    let scanner = spawn_mock_scanner(MockScannerConfig { portstate, traffic }).await;

    let mut target_traffic: HashMap<IpAddr, HashMap<u16, Vec<Pkt>>> = HashMap::new();
    // Port 80's packet never shows up in the target's capture.
    target_traffic.insert(scanner.host.address, HashMap::from([(22, vec![Pkt::new("S")])]));
    let target = spawn_mock_target(MockTargetConfig { open_ports: vec![22], traffic: target_traffic }).await;

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: "parallel".to_string(),
        scan_method: "connect".to_string(),
        timing: TimingTemplate::Normal,
        scanners: vec![scanner.host],
        firewalls: vec![],
        targets: vec![target.host],
        ports: vec![22, 80],
        firewall_args: no_firewall_args(),
        coordinator: coordinator_addr(),
    };

    let (tx, mut rx) = event_queue(16);
    tx.send(Event::Scanner { scanner: scanner.host.address, target: target.host.address }).await;

    let mut state = strategy::run(&ctx, &mut rx).await;
    let asr = state.finalize(&ctx).await;

    assert_eq!(asr, 0.5);
}

/// Scenario 5: connect-style scans match on flags alone, with no sequence
/// number attached to either side's packet trace.
#[tokio::test]
async fn scenario_5_connect_style_matches_on_flags_alone() {
    let mut portstate = HashMap::new();
    portstate.insert(443, PortState::Open);
    let mut traffic = HashMap::new();
    traffic.insert(443, vec![Pkt::new("S")]);

    let scanner = spawn_mock_scanner(MockScannerConfig { portstate, traffic }).await;

    let mut target_traffic: HashMap<IpAddr, HashMap<u16, Vec<Pkt>>> = HashMap::new();
    target_traffic.insert(scanner.host.address, HashMap::from([(443, vec![Pkt::new("S")])]));
    let target = spawn_mock_target(MockTargetConfig { open_ports: vec![443], traffic: target_traffic }).await;

    let ctx = ExperimentContext {
        client: RpcClient::new(),
        distribution_method: "parallel".to_string(),
        scan_method: "connect".to_string(),
        timing: TimingTemplate::Normal,
        scanners: vec![scanner.host],
        firewalls: vec![],
        targets: vec![target.host],
        ports: vec![443],
        firewall_args: no_firewall_args(),
        coordinator: coordinator_addr(),
    };

    let (tx, mut rx) = event_queue(16);
    tx.send(Event::Scanner { scanner: scanner.host.address, target: target.host.address }).await;

    let mut state = strategy::run(&ctx, &mut rx).await;
    let asr = state.finalize(&ctx).await;

    assert_eq!(asr, 1.0);
}
