//! Coordinator binary: loads an experiment configuration and runs the
//! full experiment matrix against the configured hosts.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use portmesh_core::Config;

/// Distributed portscan experiment coordinator
#[derive(Parser, Debug)]
#[command(name = "portmesh-coordinator")]
struct Args {
    /// Path to the experiment configuration file (JSON)
    #[arg(short = 'c', long)]
    config: PathBuf,

    /// Address agents should reach this coordinator's callback endpoint on
    #[arg(short = 'i', long, default_value = "127.0.0.1")]
    bind_ip: IpAddr,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match Config::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("failed to load configuration: {e}").red());
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        scanners = config.hosts.scanners.len(),
        firewalls = config.hosts.firewalls.len(),
        targets = config.hosts.targets.len(),
        "configuration loaded"
    );

    let bind_ip = if args.bind_ip.is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        args.bind_ip
    };

    portmesh_coordinator::run_matrix(&config, bind_ip).await;

    ExitCode::SUCCESS
}

fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();
}
