//! HTTP route handlers.
//!
//! Public routes (`/`, `/health`) answer without authentication so container
//! orchestrators can probe the service. The MCP routes require the server's
//! bearer token. Every response is marked `Cache-Control: no-store`.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod resources;
pub mod tools;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_NO_STORE;
use crate::middleware::{request_id_layer, require_bearer};
use crate::state::AppState;

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    // MCP endpoints - bearer token required
    let mcp_routes = Router::new()
        .route("/tools", get(tools::list))
        .route("/tools/call", post(tools::call))
        .route("/resources", get(resources::list))
        .route("/resources/read", post(resources::read))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    // Liveness probe and banner - no authentication
    let public_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health));

    Router::new()
        .merge(mcp_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
