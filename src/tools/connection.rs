use serde_json::{json, Value};

use super::ships::ASSETS_PATH;
use crate::protocol::ToolOutcome;
use crate::upstream::{Api, UpstreamClient, UpstreamError};

const PLATFORM_HEALTH_PATH: &str = "/health";

fn probe_status(api: Api, result: Result<Value, UpstreamError>) -> Value {
    match result {
        Ok(_) => json!({ "status": "ok" }),
        Err(e) => {
            tracing::warn!(api = %api, error = %e, "Connection test failed");
            json!({ "status": "error", "error": e.to_string() })
        }
    }
}

/// Probe both upstream APIs concurrently and report per-API status.
pub(super) async fn test_connection(upstream: &UpstreamClient) -> ToolOutcome {
    let assets_query = [("include_internal", "true".to_string())];
    let (dch, platform) = tokio::join!(
        upstream.get_json(Api::Dch, ASSETS_PATH, &assets_query),
        upstream.get_json(Api::Platform, PLATFORM_HEALTH_PATH, &[]),
    );

    let report = json!({
        "dch_api": probe_status(Api::Dch, dch),
        "platform_api": probe_status(Api::Platform, platform),
    });
    ToolOutcome::text(report.to_string())
}
