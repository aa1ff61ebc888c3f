//! Firewall agent binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use portmesh_firewall_agent::{server, SnitchState};

/// Distributed-portscan firewall (log snitch) agent
#[derive(Parser, Debug)]
#[command(name = "portmesh-firewall-agent")]
struct Args {
    /// IP address this agent's RPC server is reachable on
    #[arg(short = 'i', long, default_value = "127.0.0.1")]
    ip: IpAddr,

    /// Port this agent's RPC server listens on
    #[arg(short = 'p', long, default_value_t = 8000)]
    port: u16,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let state = SnitchState::new(args.ip);
    let router = server::router(state);
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port);
    portmesh_rpc::serve(bind_addr, router).await
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
