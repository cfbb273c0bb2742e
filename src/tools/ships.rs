use crate::protocol::ToolOutcome;
use crate::upstream::{Api, UpstreamClient};

pub(crate) const ASSETS_PATH: &str = "/assets";

/// Fetch every fleet asset, including internal ones.
pub(crate) async fn fetch_assets(
    upstream: &UpstreamClient,
) -> Result<serde_json::Value, crate::upstream::UpstreamError> {
    tracing::info!(url = %format!("{}{}", upstream.base_url(Api::Dch), ASSETS_PATH), "Fetching ships");
    upstream
        .get_json(Api::Dch, ASSETS_PATH, &[("include_internal", "true".to_string())])
        .await
}

pub(super) async fn get_ships(upstream: &UpstreamClient) -> ToolOutcome {
    let result = fetch_assets(upstream).await;
    ToolOutcome::text(super::upstream_text(&result))
}
