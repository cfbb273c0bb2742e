//! Stdio bridge between a desktop MCP client and the HTTP server.
//!
//! The client speaks newline-delimited JSON-RPC 2.0 on stdin/stdout. Catalog
//! requests (`tools/list`, `resources/list`) and `initialize` are answered
//! locally; `tools/call` and `resources/read` are forwarded to the HTTP server
//! with the configured bearer token. Forwarding failures are returned as
//! `{"error": ..}` results rather than JSON-RPC errors so the client can show
//! them.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{
    BRIDGE_REQUEST_TIMEOUT_SECS, BRIDGE_SERVER_NAME, DEFAULT_BRIDGE_SERVER_URL,
    DEFAULT_BRIDGE_TOKEN, MCP_PROTOCOL_VERSION, SERVICE_VERSION, USER_AGENT,
};
use crate::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    HANDLER_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::{resources, tools};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Bridge settings
#[derive(Clone)]
pub struct BridgeConfig {
    /// Base URL of the HTTP server
    pub server_url: String,
    /// Bearer token presented to the HTTP server
    pub token: String,
}

impl BridgeConfig {
    /// Read `MCP_SERVER_URL` and `MCP_SERVER_TOKEN`, falling back to local defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = lookup("MCP_SERVER_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BRIDGE_SERVER_URL.to_string());
        let token = lookup("MCP_SERVER_TOKEN")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BRIDGE_TOKEN.to_string());

        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Where forwarded MCP calls go.
#[async_trait]
pub trait McpBackend: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Value) -> Value;
    async fn read_resource(&self, uri: &str) -> Value;
}

/// Forwards calls to the HTTP server.
pub struct HttpBackend {
    client: reqwest::Client,
    server_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(BRIDGE_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            server_url: config.server_url.clone(),
            token: config.token.clone(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Value {
        let url = format!("{}{}", self.server_url, path);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return json!({ "error": format!("Connection error: {}", e) });
            }
            Err(e) => return json!({ "error": format!("Request failed: {}", e) }),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return json!({ "error": format!("HTTP {}: {}", status.as_u16(), body) });
        }

        match response.json::<Value>().await {
            Ok(value) => value,
            Err(e) => json!({ "error": format!("Request failed: {}", e) }),
        }
    }
}

#[async_trait]
impl McpBackend for HttpBackend {
    async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        self.post("/tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    async fn read_resource(&self, uri: &str) -> Value {
        self.post("/resources/read", json!({ "uri": uri })).await
    }
}

/// JSON-RPC dispatcher for one stdio session.
pub struct Bridge<B> {
    backend: B,
}

impl<B: McpBackend> Bridge<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Serve requests from `reader` until EOF, writing one response per line.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle one input line. Returns `None` for blank lines and notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    Some(Value::Null),
                    HANDLER_ERROR,
                    e.to_string(),
                ));
            }
        };

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = Some(request.id.unwrap_or(Value::Null));
        let method = request.method.unwrap_or_default();
        let params = match request.params {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        tracing::debug!(method = %method, "Processing");

        let result = match method.as_str() {
            "initialize" => serde_json::to_value(InitializeResult {
                protocol_version: MCP_PROTOCOL_VERSION,
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: BRIDGE_SERVER_NAME,
                    version: SERVICE_VERSION,
                },
            }),
            "notifications/initialized" => {
                tracing::info!("MCP initialized successfully");
                return None;
            }
            m if m.starts_with("notifications/") => {
                tracing::debug!(method = %m, "Ignoring notification");
                return None;
            }
            "ping" => Ok(json!({})),
            "tools/list" => serde_json::to_value(tools::catalog()),
            "resources/list" => serde_json::to_value(resources::catalog()),
            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return Some(JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        "Invalid params: 'name' must be a string",
                    ));
                };
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                tracing::info!(tool = %name, "Calling tool");
                Ok(self.backend.call_tool(name, arguments).await)
            }
            "resources/read" => {
                let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                    return Some(JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        "Invalid params: 'uri' must be a string",
                    ));
                };
                tracing::info!(uri = %uri, "Reading resource");
                Ok(self.backend.read_resource(uri).await)
            }
            other => {
                return Some(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                ));
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, HANDLER_ERROR, e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl McpBackend for RecordingBackend {
        async fn call_tool(&self, name: &str, arguments: Value) -> Value {
            self.calls.lock().unwrap().push(format!("tool:{}", name));
            json!({ "echo": { "name": name, "arguments": arguments } })
        }

        async fn read_resource(&self, uri: &str) -> Value {
            self.calls.lock().unwrap().push(format!("resource:{}", uri));
            json!({ "contents": [] })
        }
    }

    async fn respond(bridge: &Bridge<RecordingBackend>, line: &str) -> Option<Value> {
        bridge
            .handle_line(line)
            .await
            .map(|r| serde_json::to_value(r).unwrap())
    }

    #[tokio::test]
    async fn test_initialize() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-06-18");
        assert_eq!(resp["result"]["capabilities"], json!({"tools": {}, "resources": {}}));
        assert_eq!(resp["result"]["serverInfo"]["name"], "fleet-mcp-bridge");
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_blank_line_ignored() {
        let bridge = Bridge::new(RecordingBackend::default());
        assert!(respond(&bridge, "   ").await.is_none());
    }

    #[tokio::test]
    async fn test_parse_error_has_no_id() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, "{not json").await.unwrap();
        assert_eq!(resp["error"]["code"], -32700);
        assert!(resp["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Parse error: "));
        assert!(resp.get("id").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, r#"{"jsonrpc":"2.0","id":"a","method":"prompts/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["error"]["code"], -32601);
        assert_eq!(resp["error"]["message"], "Method not found: prompts/list");
    }

    #[tokio::test]
    async fn test_tools_list_matches_catalog() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let names: Vec<_> = resp["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["get_ships", "get_ship_emissions", "test_connection"]);
    }

    #[tokio::test]
    async fn test_tools_call_forwards() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(
            &bridge,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_ships"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(resp["result"]["echo"]["name"], "get_ships");
        assert_eq!(resp["result"]["echo"]["arguments"], json!({}));
        assert_eq!(*bridge.backend.calls.lock().unwrap(), vec!["tool:get_ships"]);
    }

    #[tokio::test]
    async fn test_tools_call_requires_name() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], -32602);
        assert!(bridge.backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resources_read_forwards() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(
            &bridge,
            r#"{"jsonrpc":"2.0","id":5,"method":"resources/read","params":{"uri":"fleet://ships"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(resp["result"], json!({"contents": []}));
        assert_eq!(*bridge.backend.calls.lock().unwrap(), vec!["resource:fleet://ships"]);
    }

    #[tokio::test]
    async fn test_non_object_message() {
        let bridge = Bridge::new(RecordingBackend::default());
        let resp = respond(&bridge, "[1, 2, 3]").await.unwrap();
        assert_eq!(resp["error"]["code"], -1);
        assert_eq!(resp["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_run_writes_one_line_per_response() {
        let bridge = Bridge::new(RecordingBackend::default());
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#,
            "\n"
        );
        let mut output = Vec::new();
        bridge.run(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["result"]["resources"][0]["uri"], "fleet://ships");
    }

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::from_lookup(|_| None);
        assert_eq!(config.server_url, "http://localhost:3001");
        assert_eq!(config.token, "local-dev-token");
    }

    #[test]
    fn test_config_from_env() {
        let config = BridgeConfig::from_lookup(|key| match key {
            "MCP_SERVER_URL" => Some("https://mcp.example.com/".to_string()),
            "MCP_SERVER_TOKEN" => Some("tok".to_string()),
            _ => None,
        });
        assert_eq!(config.server_url, "https://mcp.example.com");
        assert_eq!(config.token, "tok");
        assert!(!format!("{:?}", config).contains("tok\""));
    }
}
