//! # Quire - document question answering
//!
//! Quire answers questions about one document. An offline indexer splits the
//! document into overlapping chunks, embeds them and saves an index snapshot;
//! the server embeds each question, retrieves the closest chunks and asks a
//! chat model to answer from them, taking the conversation so far into
//! account.
//!
//! ## Overview
//!
//! 1. **As a standalone server** - run `quire-server index`, then `quire-server serve`
//! 2. **As a library** - compose the pieces under [`rag`] yourself
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use quire::{AppState, QuireConfig};
//!
//! let config = QuireConfig::load("quire.toml")?;
//! let state = AppState::from_config(&config).await?;
//! let answer = state.service.answer("What color is the sky?", &[]).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI chat and embeddings (default) |
//! | `ollama` | Ollama chat and embeddings (default) |
//! | `local-embeddings` | In-process embeddings via fastembed |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Conversation history normalization.
pub mod memory;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use rag::embeddings::{Embedder, EmbedderProvider};
pub use rag::index::{IndexHandle, IndexState};
pub use rag::service::QaService;
pub use types::{AppError, Result};
pub use utils::toml_config::QuireConfig;

use crate::rag::{answer::AnswerEngine, index::load_or_fail, retriever::Retriever};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Retrieval and answering over the current index
    pub service: Arc<QaService>,
    /// The index the service reads from, for health reporting
    pub index: Arc<IndexHandle>,
}

impl AppState {
    pub fn new(service: Arc<QaService>) -> Self {
        let index = Arc::clone(service.index());
        Self { service, index }
    }

    /// Build providers and load the index named by `config`.
    ///
    /// A missing or unusable index does not fail startup: the state comes
    /// up with the index marked unavailable and `/api/chat` answers 500
    /// until an index is in place.
    pub async fn from_config(config: &QuireConfig) -> Result<Self> {
        let generator = LLMClientFactory::new(config.llm_provider()?).create_default()?;
        let embedder = config.embedder_provider()?.create_embedder()?;

        let index = match load_or_fail(&config.rag.index_path, embedder.as_ref()).await {
            Ok(index) => IndexHandle::ready(index),
            Err(e) => {
                tracing::warn!(error = %e, "Serving without an index");
                IndexHandle::unavailable(e.to_string())
            }
        };

        let timeout = config.request_timeout();
        let retriever = Retriever::new(embedder, config.rag.top_k, timeout)?;
        let engine = AnswerEngine::new(generator, config.answer_config())?;
        let service = QaService::new(
            Arc::new(index),
            retriever,
            engine,
            config.answer.history_policy,
        );

        Ok(Self::new(Arc::new(service)))
    }
}
