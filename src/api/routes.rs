use crate::api::handlers::{chat, health};
use crate::api::ApiDoc;
use crate::types::ErrorResponse;
use crate::AppState;
use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

fn chat_route() -> MethodRouter<AppState> {
    post(chat::chat).fallback(chat::method_not_allowed)
}

/// Routes mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/chat", chat_route())
        .route("/chat/", chat_route())
        .route("/health", get(health::health))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// Rewrite the body limit's plain-text 413 into the JSON error shape.
async fn json_payload_too_large(response: Response, max_body_bytes: usize) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }

    tracing::debug!(max_body_bytes, "Rejected oversized request body");
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorResponse {
            error: format!("request body exceeds {} bytes", max_body_bytes),
            retryable: None,
        }),
    )
        .into_response()
}

/// The complete application: `/api` routes, middleware and state.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .nest("/api", create_router())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(move |response: Response| {
            json_payload_too_large(response, max_body_bytes)
        }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationRequest, LLMClient};
    use crate::memory::HistoryPolicy;
    use crate::rag::answer::{AnswerConfig, AnswerEngine};
    use crate::rag::embeddings::Embedder;
    use crate::rag::retriever::Retriever;
    use crate::types::ExternalError;
    use crate::{IndexHandle, QaService};
    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Silent;

    #[async_trait]
    impl Embedder for Silent {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExternalError> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "silent"
        }
    }

    #[async_trait]
    impl LLMClient for Silent {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, ExternalError> {
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "silent"
        }
    }

    fn test_app(max_body_bytes: usize) -> Router {
        let retriever = Retriever::new(Arc::new(Silent), 1, Duration::from_secs(1)).unwrap();
        let engine = AnswerEngine::new(Arc::new(Silent), AnswerConfig::default()).unwrap();
        let service = QaService::new(
            Arc::new(IndexHandle::unavailable("test")),
            retriever,
            engine,
            HistoryPolicy::Lenient,
        );
        app(AppState::new(Arc::new(service)), max_body_bytes)
    }

    async fn json_body(response: Response) -> Value {
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let body = format!(r#"{{"question": "{}"}}"#, "x".repeat(256));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/chat")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap();

        let response = test_app(64).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["error"], "request body exceeds 64 bytes");
        assert!(body.get("retryable").is_none());
    }

    #[tokio::test]
    async fn test_oversized_streamed_body_is_json_413() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = (0..8)
            .map(|_| Ok(Bytes::from_static(b"{\"question\": \"xxxxxxxxxxxxxxxx\"}")))
            .collect();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/chat")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();

        let response = test_app(64).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_delete_is_method_not_allowed() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/chat/")
            .body(Body::empty())
            .unwrap();

        let response = test_app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let request = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();

        let response = test_app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
