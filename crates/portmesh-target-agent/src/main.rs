//! Target agent binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use portmesh_target_agent::{server, MonitorState};

/// Distributed-portscan target agent
#[derive(Parser, Debug)]
#[command(name = "portmesh-target-agent")]
struct Args {
    /// IP address this agent's RPC server is reachable on
    #[allow(dead_code)]
    #[arg(short = 'i', long, default_value = "127.0.0.1")]
    ip: IpAddr,

    /// Port this agent's RPC server listens on
    #[arg(short = 'p', long, default_value_t = 8000)]
    port: u16,

    /// Interface to passively sniff traffic on (auto-detect if omitted)
    #[arg(short = 'd', long)]
    iface: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let state = MonitorState::new(args.iface);
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
