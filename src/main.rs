//! fleet-mcp server.
//!
//! This is the application entry point. It loads configuration from an
//! optional TOML file and the environment, initializes tracing, builds the
//! upstream API client, sets up the Axum router, and starts the HTTP server.

use std::path::PathBuf;

use clap::Parser;

use fleet_mcp::config::AppConfig;
use fleet_mcp::http::start_server;
use fleet_mcp::logging::{init_tracing, resolve_filter, LogTarget};
use fleet_mcp::tools::ToolService;
use fleet_mcp::upstream::UpstreamClient;
use fleet_mcp::{create_router, AppState};

/// fleet-mcp: MCP tool server for fleet voyage and emissions data
#[derive(Parser, Debug)]
#[command(name = "fleet-mcp", version, about)]
struct Args {
    /// Path to configuration file (default: config/default.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "fleet_mcp=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration first: the log format comes from it
    let config = AppConfig::load(args.config.as_deref())?;

    let log_filter = resolve_filter(args.log_level, |key| std::env::var(key).ok());
    init_tracing(&log_filter, config.logging.format, LogTarget::Stdout);

    tracing::info!(
        dch_api_url = %config.upstream.dch_api_url,
        platform_api_url = %config.upstream.platform_api_url,
        max_retry_attempts = config.upstream.max_retry_attempts,
        request_timeout_seconds = config.upstream.request_timeout_seconds,
        token_refresh_threshold_seconds = config.upstream.token_refresh_threshold_seconds,
        "Loaded configuration"
    );

    let upstream = UpstreamClient::new(&config)?;
    let http_config = config.http.clone();
    let state = AppState::new(config, ToolService::new(upstream));

    let app = create_router(state);

    start_server(app, &http_config).await?;

    tracing::info!("Server stopped");
    Ok(())
}
