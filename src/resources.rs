//! MCP resources.
//!
//! Resources are read-only views over the same upstream data the tools use,
//! addressed by `fleet://` URIs.

use crate::protocol::{Resource, ResourceContents, ResourceOutcome, ResourcesListResult};
use crate::tools::fetch_assets;
use crate::upstream::UpstreamClient;

pub const SHIPS_URI: &str = "fleet://ships";

const JSON_MIME: &str = "application/json";

/// Resource catalog advertised to MCP clients.
pub fn catalog() -> ResourcesListResult {
    ResourcesListResult {
        resources: vec![Resource {
            uri: SHIPS_URI,
            name: "Fleet Ships",
            description: "All ships (assets) in the fleet, including internal assets",
            mime_type: JSON_MIME,
        }],
    }
}

pub async fn read_resource(upstream: &UpstreamClient, uri: &str) -> ResourceOutcome {
    match uri {
        SHIPS_URI => match fetch_assets(upstream).await {
            Ok(body) => ResourceOutcome::Contents {
                contents: vec![ResourceContents {
                    uri: uri.to_string(),
                    mime_type: JSON_MIME.to_string(),
                    text: body.to_string(),
                }],
            },
            Err(e) => ResourceOutcome::Error {
                error: e.to_string(),
            },
        },
        other => {
            tracing::warn!(uri = %other, "Unknown resource requested");
            ResourceOutcome::Error {
                error: format!("Unknown resource: {}", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_ships() {
        let list = catalog();
        assert_eq!(list.resources.len(), 1);
        assert_eq!(list.resources[0].uri, "fleet://ships");

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["resources"][0]["mimeType"], "application/json");
    }
}
