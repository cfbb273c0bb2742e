//! Health check endpoint for container orchestration.
//!
//! Provides a liveness probe that returns 200 OK with a small JSON status
//! document whenever the process can serve HTTP. The container health check
//! polls it every 30 seconds.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::{HEALTH_SERVICE_NAME, SERVICE_VERSION};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub auth_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
}

/// Health check handler. Requires no authentication.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: HEALTH_SERVICE_NAME,
        version: SERVICE_VERSION,
        auth_configured: !state.config.auth.mcp_server_token.is_empty(),
    })
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "MCP Server is running",
        version: SERVICE_VERSION,
    })
}
