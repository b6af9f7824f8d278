//! HTTP API Handlers and Routes
//!
//! The serve-time contract, built on the Axum web framework.
//!
//! # API Endpoints
//!
//! - `POST /api/chat` - `{question, history}` in, `{answer}` or `{error}` out
//! - `GET /api/health` - index readiness (`ok` or `degraded`)
//! - `GET /api/openapi.json` - OpenAPI document for the above
//!
//! Errors are JSON objects with an `error` field. Status codes: 400 for an
//! unusable request, 405 for a verb other than POST on `/api/chat`, and 500
//! when the index is unavailable or generation fails.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, IndexStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::chat::chat, handlers::health::health),
    components(schemas(ChatRequest, ChatResponse, ErrorResponse, HealthResponse, IndexStatus)),
    tags(
        (name = "chat", description = "Question answering over the indexed document"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;
