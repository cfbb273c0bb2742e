use axum::{extract::State, Json};

use crate::protocol::{ResourceOutcome, ResourceRequest, ResourcesListResult};
use crate::resources;
use crate::state::AppState;

pub async fn list() -> Json<ResourcesListResult> {
    Json(resources::catalog())
}

pub async fn read(
    State(state): State<AppState>,
    Json(request): Json<ResourceRequest>,
) -> Json<ResourceOutcome> {
    tracing::info!(uri = %request.uri, "Resource read");

    Json(resources::read_resource(state.tools.upstream(), &request.uri).await)
}
