use crate::{
    rag::index::IndexState,
    types::{HealthResponse, IndexStatus},
    AppState,
};
use axum::{extract::State, Json};

/// Report whether the retrieval subsystem is usable
///
/// Always 200; a missing or broken index shows up as `degraded`.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.index.snapshot().as_ref() {
        IndexState::Ready(index) => HealthResponse {
            status: "ok".to_string(),
            index: IndexStatus {
                ready: true,
                chunks: Some(index.len()),
                dimensions: Some(index.dimensions()),
                reason: None,
            },
        },
        IndexState::Unavailable { reason } => HealthResponse {
            status: "degraded".to_string(),
            index: IndexStatus {
                ready: false,
                chunks: None,
                dimensions: None,
                reason: Some(reason.clone()),
            },
        },
    };

    Json(response)
}
