//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::document`](crate::rag::document) - Paginated source document loading
//! - [`rag::chunker`](crate::rag::chunker) - Fixed-size overlapping chunks per page
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedder capability and providers
//! - [`rag::index`](crate::rag::index) - Index build, load-or-fail and the swappable handle
//! - [`rag::indexer`](crate::rag::indexer) - Offline document to index driver
//! - [`rag::retriever`](crate::rag::retriever) - Question to context string
//! - [`rag::answer`](crate::rag::answer) - Prompt assembly and the single generator call
//! - [`rag::service`](crate::rag::service) - `answer(question, history)` end to end
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - the document is split into pages and chunked
//! 2. **Storage** - chunk embeddings are written to an index snapshot
//! 3. **Retrieval** - the question is embedded and the nearest chunks joined
//! 4. **Generation** - the LLM answers from that context and the conversation
//!
//! # Example
//!
//! ```ignore
//! use quire::rag::{chunker::TextChunker, document::Document, index};
//!
//! let document = Document::load("data/document.txt".as_ref()).await?;
//! let chunks = TextChunker::new(1000, 200)?.split(&document)?;
//! let index = index::build(&chunks, embedder.as_ref(), &Default::default()).await?;
//! ```

pub mod answer;
pub mod chunker;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod retriever;
pub mod service;

use crate::types::ExternalError;
use std::future::Future;
use std::time::Duration;

/// Run an external call under a deadline, reporting expiry as a timeout.
pub(crate) async fn time_box<T, F>(
    limit: Duration,
    operation: &str,
    call: F,
) -> std::result::Result<T, ExternalError>
where
    F: Future<Output = std::result::Result<T, ExternalError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?limit, "External call timed out");
            Err(ExternalError::timeout(operation, limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;

    #[tokio::test(start_paused = true)]
    async fn test_time_box_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ExternalError>(())
        };
        let err = time_box(Duration::from_secs(1), "generation", slow)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_time_box_passes_through() {
        let value = time_box(Duration::from_secs(1), "embedding", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
