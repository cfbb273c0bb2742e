//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::TokenDigest;
use crate::tools::ToolService;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Contains the application configuration, the tool dispatcher (which owns
/// the upstream API client), and the digest of the expected bearer token.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tools: ToolService,
    pub server_token: TokenDigest,
}

impl AppState {
    /// Creates a new application state from the given configuration and tool service.
    pub fn new(config: AppConfig, tools: ToolService) -> Self {
        let server_token = TokenDigest::of(&config.auth.mcp_server_token);
        Self {
            config: Arc::new(config),
            tools,
            server_token,
        }
    }
}
