//! End-to-end tests for the stdio bridge against a live server.
//!
//! A fake upstream and the real MCP router are both served on ephemeral
//! ports; the bridge is driven with in-memory input and its output lines are
//! parsed back as JSON-RPC responses.

use std::collections::HashMap;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use fleet_mcp::bridge::{Bridge, BridgeConfig, HttpBackend};
use fleet_mcp::config::AppConfig;
use fleet_mcp::tools::ToolService;
use fleet_mcp::upstream::UpstreamClient;
use fleet_mcp::{create_router, AppState};

const SERVER_TOKEN: &str = "bridge-test-token";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_server() -> String {
    let upstream = Router::new().route(
        "/assets",
        get(|| async { Json(json!([{"id": "ship-1", "name": "Aurora"}])) }),
    );
    let upstream_url = serve(upstream).await;

    let vars: HashMap<&str, String> = HashMap::from([
        ("MCP_SERVER_TOKEN", SERVER_TOKEN.to_string()),
        ("DCH_API_TOKEN", "dch".to_string()),
        ("PLATFORM_API_TOKEN", "platform".to_string()),
        ("DCH_API_URL", upstream_url.clone()),
        ("PLATFORM_API_URL", upstream_url),
    ]);
    let config = AppConfig::from_sources(None, |key| vars.get(key).cloned()).unwrap();
    let upstream = UpstreamClient::new(&config).unwrap();
    serve(create_router(AppState::new(config, ToolService::new(upstream)))).await
}

async fn run_bridge(server_url: &str, token: &str, input: &str) -> Vec<Value> {
    let config = BridgeConfig::from_lookup(|key| match key {
        "MCP_SERVER_URL" => Some(server_url.to_string()),
        "MCP_SERVER_TOKEN" => Some(token.to_string()),
        _ => None,
    });
    let bridge = Bridge::new(HttpBackend::new(&config).unwrap());

    let mut output = Vec::new();
    bridge.run(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn tool_call_round_trips_through_server() {
    let server_url = spawn_server().await;
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_ships","arguments":{}}}"#,
        "\n",
    );

    let responses = run_bridge(&server_url, SERVER_TOKEN, input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[1]["id"], 2);

    let text = responses[1]["result"]["content"][0]["text"].as_str().unwrap();
    let ships: Value = serde_json::from_str(text).unwrap();
    assert_eq!(ships[0]["name"], "Aurora");
}

#[tokio::test]
async fn resource_read_round_trips_through_server() {
    let server_url = spawn_server().await;
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":7,"method":"resources/read","params":{"uri":"fleet://ships"}}"#,
        "\n",
    );

    let responses = run_bridge(&server_url, SERVER_TOKEN, input).await;
    assert_eq!(responses[0]["result"]["contents"][0]["uri"], "fleet://ships");
}

#[tokio::test]
async fn wrong_token_surfaces_http_error() {
    let server_url = spawn_server().await;
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_ships"}}"#,
        "\n",
    );

    let responses = run_bridge(&server_url, "not-the-token", input).await;
    let error = responses[0]["result"]["error"].as_str().unwrap();
    assert!(error.starts_with("HTTP 401: "), "{}", error);
    assert!(error.contains("Invalid MCP server token"));
}

#[tokio::test]
async fn unreachable_server_surfaces_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"get_ships"}}"#,
        "\n",
    );

    let responses = run_bridge(&server_url, SERVER_TOKEN, input).await;
    let error = responses[0]["result"]["error"].as_str().unwrap();
    assert!(error.starts_with("Connection error: "), "{}", error);
}
