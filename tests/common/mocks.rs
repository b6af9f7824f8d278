//! Mock providers for testing.
//!
//! Deterministic stand-ins for the embedding and chat model so tests never
//! touch the network.

#![allow(dead_code)]

use async_trait::async_trait;
use quire::llm::{GenerationRequest, LLMClient};
use quire::memory::HistoryPolicy;
use quire::rag::answer::{AnswerConfig, AnswerEngine};
use quire::rag::embeddings::Embedder;
use quire::rag::retriever::Retriever;
use quire::types::{ExternalError, FailureKind};
use quire::{AppState, IndexHandle, QaService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Embeds text as keyword counts, one axis per keyword plus a small bias
/// axis so no vector is all zeros.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
    calls: AtomicUsize,
    fail_with: Option<FailureKind>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
            calls: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    /// Default vocabulary used across tests.
    pub fn colors() -> Self {
        Self::new(&["sky", "blue", "grass", "green", "sun", "yellow"])
    }

    /// Every call fails with `kind`.
    pub fn failing(kind: FailureKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::colors()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this embedder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| text.matches(k).count() as f32)
            .collect();
        vector.push(0.1);
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.fail_with {
            return Err(ExternalError::new(kind, "mock embedder failure"));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.keywords.len() + 1
    }

    fn model_name(&self) -> &str {
        "keyword-mock"
    }
}

/// Chat model that records every request and replies with a fixed answer.
pub struct MockLLMClient {
    response: String,
    fail_with: Option<FailureKind>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that always returns an error of `kind`.
    pub fn failing(kind: FailureKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ExternalError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.fail_with {
            Some(kind) => Err(ExternalError::new(kind, "mock generator failure")),
            None => Ok(self.response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

/// Wire a service around the given index state and mocks.
pub fn app_state(
    index: IndexHandle,
    embedder: Arc<KeywordEmbedder>,
    llm: Arc<MockLLMClient>,
    policy: HistoryPolicy,
) -> AppState {
    let retriever = Retriever::new(embedder, 2, Duration::from_secs(5)).unwrap();
    let engine = AnswerEngine::new(llm, AnswerConfig::default()).unwrap();
    let service = QaService::new(Arc::new(index), retriever, engine, policy);
    AppState::new(Arc::new(service))
}
