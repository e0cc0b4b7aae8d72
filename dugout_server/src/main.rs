// CLI entry point for the Dugout scorekeeping server.
//
// Starts a standalone server that scorers and observers connect to, then
// blocks until the process is killed. See `server.rs` for the networking
// architecture and `router.rs` for how commands are handled.
//
// Every flag can also be set from the environment:
//   dugout [OPTIONS]
//     --bind <ADDR>        Interface to listen on   [env: DUGOUT_BIND]      (default 0.0.0.0)
//     --port <PORT>        Listen port              [env: DUGOUT_PORT]      (default 5000)
//     --audit-log <PATH>   JSON-lines audit file    [env: DUGOUT_AUDIT_LOG] (default none)
//
// Log verbosity follows `RUST_LOG` (default `dugout=info`).

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dugout_server::{ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dugout", version, about = "Live baseball scorekeeping server")]
struct Cli {
    /// Interface to listen on.
    #[arg(long, env = "DUGOUT_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// TCP port to listen on.
    #[arg(long, env = "DUGOUT_PORT", default_value_t = dugout_server::config::DEFAULT_PORT)]
    port: u16,

    /// Append every game event to this JSON-lines file.
    #[arg(long, env = "DUGOUT_AUDIT_LOG")]
    audit_log: Option<PathBuf>,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        ServerConfig {
            bind: cli.bind,
            port: cli.port,
            audit_log: cli.audit_log,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dugout=info")),
        )
        .init();

    let config = ServerConfig::from(Cli::parse());
    let requested = config.socket_addr();
    let (handle, addr) =
        start_server(config).with_context(|| format!("failed to start server on {requested}"))?;

    info!(%addr, "ready for scorers; press Ctrl+C to stop");
    handle.wait();
    Ok(())
}
