mod common;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::{app_state, KeywordEmbedder, MockLLMClient};
use quire::api::routes::app;
use quire::memory::HistoryPolicy;
use quire::rag::chunker::TextChunker;
use quire::rag::document::Document;
use quire::rag::index::{build, BuildOptions};
use quire::types::FailureKind;
use quire::IndexHandle;
use serde_json::{json, Value};
use std::sync::Arc;

const DOCUMENT: &str = "The sky is blue.\u{000C}The grass is green.\u{000C}The sun is yellow.";

async fn ready_index(embedder: &KeywordEmbedder) -> IndexHandle {
    let chunks = TextChunker::new(100, 10)
        .unwrap()
        .split(&Document::from_text("test", DOCUMENT))
        .unwrap();
    let index = build(&chunks, embedder, &BuildOptions::default()).await.unwrap();
    IndexHandle::ready(index)
}

struct Harness {
    server: TestServer,
    embedder: Arc<KeywordEmbedder>,
    llm: Arc<MockLLMClient>,
}

async fn harness_with(llm: MockLLMClient, policy: HistoryPolicy) -> Harness {
    let embedder = Arc::new(KeywordEmbedder::colors());
    let index = ready_index(&embedder).await;
    let llm = Arc::new(llm);
    let state = app_state(index, Arc::clone(&embedder), Arc::clone(&llm), policy);
    let server = TestServer::new(app(state, 64 * 1024)).unwrap();
    Harness {
        server,
        embedder,
        llm,
    }
}

async fn harness() -> Harness {
    harness_with(MockLLMClient::new("The sky is blue."), HistoryPolicy::Lenient).await
}

#[tokio::test]
async fn test_chat_answers_question() {
    let h = harness().await;
    let calls_after_build = h.embedder.calls();

    let response = h
        .server
        .post("/api/chat")
        .json(&json!({"question": "What color is the sky?", "history": [["hi", "hello"]]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({"answer": "The sky is blue."}));

    assert_eq!(h.llm.calls(), 1);
    assert_eq!(h.embedder.calls(), calls_after_build + 1);
    let request = h.llm.last_request().unwrap();
    assert!(request.system.contains("The sky is blue."));
    assert_eq!(request.history.len(), 1);
    assert_eq!(request.question, "What color is the sky?");
}

#[tokio::test]
async fn test_chat_accepts_trailing_slash_and_any_content_type() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/chat/")
        .text(r#"{"question": "Is the grass green?"}"#)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/chat")
        .bytes(Bytes::from_static(b"{not json"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_missing_or_blank_question_is_400() {
    let h = harness().await;

    for body in [
        json!({}),
        json!({"question": ""}),
        json!({"question": "   "}),
        json!({"question": 42}),
        json!(["What color is the sky?"]),
    ] {
        let response = h.server.post("/api/chat").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "body: {}", body);
        let json: Value = response.json();
        assert!(json["error"].as_str().is_some());
    }
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_wrong_verb_is_405_without_retrieval() {
    let h = harness().await;
    let calls_after_build = h.embedder.calls();

    let get = h.server.get("/api/chat").await;
    assert_eq!(get.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = get.json();
    assert!(body["error"].is_string());

    let put = h.server.put("/api/chat").json(&json!({"question": "x"})).await;
    assert_eq!(put.status_code(), StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(h.embedder.calls(), calls_after_build);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_malformed_history_is_dropped_leniently() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/chat")
        .json(&json!({
            "question": "And the grass?",
            "history": [["hi", "hello"], ["bad"], ["q2", "a2"]]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let request = h.llm.last_request().unwrap();
    let questions: Vec<&str> = request.history.iter().map(|t| t.question.as_str()).collect();
    assert_eq!(questions, vec!["hi", "q2"]);
}

#[tokio::test]
async fn test_strict_history_policy_rejects_bad_entries() {
    let h = harness_with(MockLLMClient::new("ok"), HistoryPolicy::Strict).await;

    let response = h
        .server
        .post("/api/chat")
        .json(&json!({"question": "q", "history": [["a", "b"], ["only one"]]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("entry 1"));
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_unavailable_index_is_500() {
    let embedder = Arc::new(KeywordEmbedder::colors());
    let llm = Arc::new(MockLLMClient::new("unused"));
    let state = app_state(
        IndexHandle::unavailable("index snapshot not found"),
        Arc::clone(&embedder),
        Arc::clone(&llm),
        HistoryPolicy::Lenient,
    );
    let server = TestServer::new(app(state, 64 * 1024)).unwrap();

    let response = server
        .post("/api/chat")
        .json(&json!({"question": "What color is the sky?"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert_eq!(llm.calls(), 0);

    // bad input is still a 400 even without an index
    let response = server.post("/api/chat").text("nope").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generation_failure_is_500_with_retry_hint() {
    let h = harness_with(
        MockLLMClient::failing(FailureKind::RateLimited),
        HistoryPolicy::Lenient,
    )
    .await;

    let response = h
        .server
        .post("/api/chat")
        .json(&json!({"question": "What color is the sky?"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["retryable"], json!(true));
    assert_eq!(h.llm.calls(), 1);

    let h = harness_with(
        MockLLMClient::failing(FailureKind::Authentication),
        HistoryPolicy::Lenient,
    )
    .await;
    let response = h.server.post("/api/chat").json(&json!({"question": "q"})).await;
    let body: Value = response.json();
    assert_eq!(body["retryable"], json!(false));
}

#[tokio::test]
async fn test_health_reports_index_state() {
    let h = harness().await;
    let response = h.server.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index"]["ready"], true);
    assert_eq!(body["index"]["chunks"], 3);
    assert_eq!(body["index"]["dimensions"], 7);

    let state = app_state(
        IndexHandle::unavailable("missing"),
        Arc::new(KeywordEmbedder::colors()),
        Arc::new(MockLLMClient::new("")),
        HistoryPolicy::Lenient,
    );
    let server = TestServer::new(app(state, 1024)).unwrap();
    let body: Value = server.get("/api/health").await.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["index"]["ready"], false);
    assert_eq!(body["index"]["reason"], "missing");
}

#[tokio::test]
async fn test_openapi_document_lists_chat() {
    let h = harness().await;
    let body: Value = h.server.get("/api/openapi.json").await.json();
    assert!(body["paths"]["/api/chat"]["post"].is_object());
    assert!(body["paths"]["/api/health"]["get"].is_object());
}
