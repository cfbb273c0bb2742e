//! fleet-mcp stdio bridge.
//!
//! Speaks JSON-RPC 2.0 on stdin/stdout for desktop MCP clients and forwards
//! tool calls and resource reads to the fleet-mcp HTTP server. All logging
//! goes to stderr.

use clap::Parser;
use tokio::io::BufReader;

use fleet_mcp::bridge::{Bridge, BridgeConfig, HttpBackend};
use fleet_mcp::config::LogFormat;
use fleet_mcp::logging::{init_tracing, resolve_filter, LogTarget};

/// fleet-mcp-bridge: stdio MCP bridge to a fleet-mcp server
#[derive(Parser, Debug)]
#[command(name = "fleet-mcp-bridge", version, about)]
struct Args {
    /// Server URL (overrides MCP_SERVER_URL)
    #[arg(long)]
    server_url: Option<String>,

    /// Log level filter for stderr output
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_filter = resolve_filter(args.log_level, |key| std::env::var(key).ok());
    init_tracing(&log_filter, LogFormat::Text, LogTarget::Stderr);

    let mut config = BridgeConfig::from_lookup(|key| std::env::var(key).ok());
    if let Some(url) = args.server_url {
        config.server_url = url.trim_end_matches('/').to_string();
    }

    tracing::info!(server_url = %config.server_url, "MCP bridge starting");

    let bridge = Bridge::new(HttpBackend::new(&config)?);
    let result = bridge
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    match &result {
        Ok(()) => tracing::info!("MCP bridge shutting down"),
        Err(e) => tracing::error!(error = %e, "MCP bridge failed"),
    }
    Ok(result?)
}
