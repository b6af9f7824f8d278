//! Question to context string.

use crate::rag::embeddings::Embedder;
use crate::rag::time_box;
use crate::types::{AppError, ExternalError, FailureKind, Result};
use quire_vector::VectorIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Separator placed between retrieved chunk texts.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub score: f32,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize, timeout: Duration) -> Result<Self> {
        if top_k == 0 {
            return Err(AppError::InvalidInput("top_k must be >= 1".into()));
        }
        Ok(Self {
            embedder,
            top_k,
            timeout,
        })
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The `top_k` chunks closest to `question`, best first.
    ///
    /// An empty index yields no passages without calling the embedder.
    #[instrument(skip(self, index, question), fields(top_k = self.top_k, records = index.len()))]
    pub async fn passages(&self, index: &VectorIndex, question: &str) -> Result<Vec<Passage>> {
        if index.is_empty() {
            debug!("Index is empty, retrieving nothing");
            return Ok(Vec::new());
        }

        let query = time_box(self.timeout, "question embedding", self.embedder.embed(question))
            .await
            .map_err(AppError::Embedding)?;
        if !query.iter().all(|v| v.is_finite()) {
            return Err(AppError::Embedding(ExternalError::new(
                FailureKind::Malformed,
                "question embedding contains NaN or infinite values",
            )));
        }

        // A dimension mismatch here means the index and embedder disagree.
        let hits = index.search(&query, self.top_k)?;
        let passages: Vec<Passage> = hits
            .into_iter()
            .map(|hit| Passage {
                id: hit.record.id.clone(),
                text: hit.record.text.clone(),
                score: hit.score,
            })
            .collect();

        debug!(
            hits = passages.len(),
            best = passages.first().map(|p| p.score),
            "Retrieved passages"
        );
        Ok(passages)
    }

    /// Retrieved chunk texts joined in rank order by a blank line.
    pub async fn retrieve(&self, index: &VectorIndex, question: &str) -> Result<String> {
        let passages = self.passages(index, question).await?;
        Ok(passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }
}
