use crate::{
    memory::normalize,
    types::{AppError, ChatRequest, ChatResponse, ErrorResponse, Result},
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Answer a question about the indexed document
///
/// The body is read as raw bytes and parsed here, so a missing or wrong
/// `Content-Type` header is not an error.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer", body = ChatResponse),
        (status = 400, description = "Invalid JSON, missing question or malformed history", body = ErrorResponse),
        (status = 405, description = "Only POST is accepted", body = ErrorResponse),
        (status = 500, description = "Index unavailable or generation failure", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatResponse>> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("request body is not valid JSON: {}", e)))?;

    let fields = payload
        .as_object()
        .ok_or_else(|| AppError::InvalidInput("request body must be a JSON object".into()))?;

    let question = fields
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("'question' must be a non-empty string".into()))?;

    let history = normalize(fields.get("history"), state.service.history_policy())?;

    let answer = state.service.answer(question, &history).await?;
    Ok(Json(ChatResponse { answer }))
}

/// Any verb other than POST on the chat route.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method not allowed: use POST".to_string(),
            retryable: None,
        }),
    )
        .into_response()
}
