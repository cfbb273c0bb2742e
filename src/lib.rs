//! fleet-mcp: an MCP tool server for fleet voyage and emissions data.
//!
//! The HTTP server exposes MCP tools and resources backed by the upstream
//! fleet (DCH) API behind a bearer token, plus an unauthenticated `/health`
//! liveness probe. The stdio bridge lets desktop MCP clients reach the server
//! over JSON-RPC.

pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod protocol;
pub mod resources;
pub mod routes;
pub mod state;
pub mod tools;
pub mod upstream;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
