use axum::{extract::State, Json};

use crate::protocol::{ToolCallRequest, ToolOutcome, ToolsListResult};
use crate::state::AppState;
use crate::tools;

pub async fn list() -> Json<ToolsListResult> {
    Json(tools::catalog())
}

/// Execute a tool. Tool failures are reported in the 200 response body.
pub async fn call(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Json<ToolOutcome> {
    let argument_names: Vec<&str> = request.arguments.keys().map(String::as_str).collect();
    tracing::info!(tool = %request.name, args = ?argument_names, "Tool call");

    Json(state.tools.call(&request.name, &request.arguments).await)
}
