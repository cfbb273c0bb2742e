//! MCP tools backed by the upstream fleet API.
//!
//! `ToolService` owns the upstream client and dispatches calls by tool name.
//! Each tool lives in its own module and returns a [`ToolOutcome`].

mod connection;
mod emissions;
mod ships;

pub use emissions::{resolve_period, PeriodError, TimePeriod};
pub(crate) use ships::fetch_assets;

use serde_json::{json, Map, Value};

use crate::protocol::{Tool, ToolOutcome, ToolsListResult};
use crate::upstream::UpstreamClient;

pub const GET_SHIPS: &str = "get_ships";
pub const GET_SHIP_EMISSIONS: &str = "get_ship_emissions";
pub const TEST_CONNECTION: &str = "test_connection";

/// Tool catalog advertised to MCP clients.
pub fn catalog() -> ToolsListResult {
    ToolsListResult {
        tools: vec![
            Tool {
                name: GET_SHIPS,
                description: "List all ships (assets) in the fleet, including internal assets",
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: GET_SHIP_EMISSIONS,
                description: "Get voyage emissions for a ship over a time period \
                              (defaults to year-to-date)",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "asset_id": {"type": "string", "description": "Ship asset ID"},
                        "ship_id": {"type": "string", "description": "Alias for asset_id"},
                        "start": {
                            "type": "string",
                            "description": "Period start, ISO 8601 (YYYY-MM-DDTHH:MM:SS)"
                        },
                        "end": {
                            "type": "string",
                            "description": "Period end, ISO 8601 (YYYY-MM-DDTHH:MM:SS)"
                        }
                    }
                }),
            },
            Tool {
                name: TEST_CONNECTION,
                description: "Test connectivity to the fleet and platform APIs",
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ],
    }
}

/// Dispatches tool calls to their handlers.
#[derive(Clone)]
pub struct ToolService {
    upstream: UpstreamClient,
}

impl ToolService {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    pub async fn call(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        match name {
            GET_SHIPS => ships::get_ships(&self.upstream).await,
            GET_SHIP_EMISSIONS => emissions::get_ship_emissions(&self.upstream, arguments).await,
            TEST_CONNECTION => connection::test_connection(&self.upstream).await,
            other => {
                tracing::warn!(tool = %other, "Unknown tool requested");
                ToolOutcome::error(format!("Unknown tool: {}", other))
            }
        }
    }
}

/// Render an upstream result the way tools report it: the body itself, or
/// `{"error": ..}` on failure, as compact JSON text.
fn upstream_text(result: &Result<Value, crate::upstream::UpstreamError>) -> String {
    let value = match result {
        Ok(body) => body.clone(),
        Err(e) => json!({ "error": e.to_string() }),
    };
    value.to_string()
}

/// Read a scalar argument as a string. Empty strings count as absent.
fn scalar_arg(arguments: &Map<String, Value>, key: &str) -> Option<String> {
    match arguments.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
