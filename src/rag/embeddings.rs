//! Text embedding providers.
//!
//! The same [`Embedder`] must be used to build an index and to embed the
//! questions searched against it; the index manifest records the model name
//! and dimensionality so a mismatch is caught at load time.

use crate::types::{AppError, ExternalError, FailureKind, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Embedding capability: text in, fixed-length vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The output has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ExternalError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ExternalError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ExternalError::new(FailureKind::Malformed, "embedder returned no vector"))
    }

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

// ============= OpenAI =============

#[cfg(feature = "openai")]
pub use self::openai::OpenAIEmbedder;

#[cfg(feature = "openai")]
mod openai {
    use super::*;
    use crate::llm::openai::{http_client, post_json};
    use serde::{Deserialize, Serialize};

    /// `/embeddings` client for OpenAI and compatible APIs.
    pub struct OpenAIEmbedder {
        client: reqwest::Client,
        endpoint: String,
        model: String,
        dimensions: usize,
    }

    impl OpenAIEmbedder {
        pub fn new(api_key: &str, api_base: &str, model: String, dimensions: usize) -> Result<Self> {
            Ok(Self {
                client: http_client(api_key)?,
                endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
                model,
                dimensions,
            })
        }

        /// Only the v3 models accept an explicit output size.
        fn requested_dimensions(&self) -> Option<usize> {
            self.model
                .starts_with("text-embedding-3")
                .then_some(self.dimensions)
        }
    }

    #[derive(Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a [String],
        #[serde(skip_serializing_if = "Option::is_none")]
        dimensions: Option<usize>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
        index: usize,
    }

    #[async_trait]
    impl Embedder for OpenAIEmbedder {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, ExternalError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.requested_dimensions(),
            };
            let mut parsed: EmbeddingResponse =
                post_json(&self.client, &self.endpoint, &request).await?;

            parsed.data.sort_by_key(|entry| entry.index);
            if parsed.data.len() != texts.len() {
                return Err(ExternalError::new(
                    FailureKind::Malformed,
                    format!(
                        "OpenAI returned {} embeddings for {} inputs",
                        parsed.data.len(),
                        texts.len()
                    ),
                ));
            }

            Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============= Ollama =============

#[cfg(feature = "ollama")]
pub use self::ollama::OllamaEmbedder;

#[cfg(feature = "ollama")]
mod ollama {
    use super::*;
    use crate::llm::ollama::{classify, connect};
    use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
    use ollama_rs::Ollama;

    pub struct OllamaEmbedder {
        client: Ollama,
        model: String,
        dimensions: usize,
    }

    impl OllamaEmbedder {
        pub fn new(base_url: &str, model: String, dimensions: usize) -> Result<Self> {
            Ok(Self {
                client: connect(base_url)?,
                model,
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for OllamaEmbedder {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, ExternalError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = GenerateEmbeddingsRequest::new(
                self.model.clone(),
                EmbeddingsInput::Multiple(texts.to_vec()),
            );
            let response = self
                .client
                .generate_embeddings(request)
                .await
                .map_err(classify)?;

            Ok(response.embeddings)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============= Local (fastembed) =============

#[cfg(feature = "local-embeddings")]
pub use self::local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// In-process ONNX embedding model.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        name: String,
        dimensions: usize,
    }

    fn resolve(name: &str) -> Option<(EmbeddingModel, usize)> {
        let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        match short.as_str() {
            "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
            "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
            _ => None,
        }
    }

    impl FastEmbedder {
        pub fn new(model_name: &str) -> Result<Self> {
            let (model, dimensions) = resolve(model_name).ok_or_else(|| {
                AppError::Configuration(format!("unsupported local embedding model '{}'", model_name))
            })?;

            let model = TextEmbedding::try_new(
                InitOptions::new(model).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Configuration(format!("failed to load embedding model: {}", e)))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                name: model_name.to_string(),
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, ExternalError> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();

            tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|_| ExternalError::new(FailureKind::Unavailable, "embedding model lock poisoned"))?;
                model
                    .embed(texts, None)
                    .map_err(|e| ExternalError::new(FailureKind::Malformed, e.to_string()))
            })
            .await
            .map_err(|e| ExternalError::new(FailureKind::Unavailable, e.to_string()))?
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}

// ============= Provider selection =============

/// Embedding backend selected from configuration.
#[derive(Debug, Clone)]
pub enum EmbedderProvider {
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        dimensions: usize,
    },
    Ollama {
        base_url: String,
        model: String,
        dimensions: usize,
    },
    FastEmbed { model: String },
}

impl EmbedderProvider {
    pub fn create_embedder(&self) -> Result<Arc<dyn Embedder>> {
        match self {
            #[cfg(feature = "openai")]
            EmbedderProvider::OpenAI {
                api_key,
                api_base,
                model,
                dimensions,
            } => Ok(Arc::new(OpenAIEmbedder::new(
                api_key,
                api_base,
                model.clone(),
                *dimensions,
            )?)),

            #[cfg(feature = "ollama")]
            EmbedderProvider::Ollama {
                base_url,
                model,
                dimensions,
            } => Ok(Arc::new(OllamaEmbedder::new(
                base_url,
                model.clone(),
                *dimensions,
            )?)),

            #[cfg(feature = "local-embeddings")]
            EmbedderProvider::FastEmbed { model } => Ok(Arc::new(FastEmbedder::new(model)?)),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} embeddings were not compiled into this build",
                other.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbedderProvider::OpenAI { .. } => "OpenAI",
            EmbedderProvider::Ollama { .. } => "Ollama",
            EmbedderProvider::FastEmbed { .. } => "fastembed",
        }
    }
}
