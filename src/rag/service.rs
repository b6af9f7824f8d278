//! The question-answering service handed to request handlers.

use crate::memory::HistoryPolicy;
use crate::rag::answer::AnswerEngine;
use crate::rag::index::IndexHandle;
use crate::rag::retriever::Retriever;
use crate::types::{Result, Turn};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Retrieval plus generation over the current index.
///
/// Holds no per-request state; one instance is shared by every request.
pub struct QaService {
    index: Arc<IndexHandle>,
    retriever: Retriever,
    engine: AnswerEngine,
    history_policy: HistoryPolicy,
}

impl QaService {
    pub fn new(
        index: Arc<IndexHandle>,
        retriever: Retriever,
        engine: AnswerEngine,
        history_policy: HistoryPolicy,
    ) -> Self {
        Self {
            index,
            retriever,
            engine,
            history_policy,
        }
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        self.history_policy
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Answer `question` given the prior conversation.
    ///
    /// Fails with `IndexUnavailable` when no index is loaded.
    #[instrument(skip_all, fields(turns = history.len()))]
    pub async fn answer(&self, question: &str, history: &[Turn]) -> Result<String> {
        let index = self.index.current()?;
        debug!(question, "Answering");

        let context = self.retriever.retrieve(&index, question).await?;
        self.engine.answer(question, history, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationRequest, LLMClient};
    use crate::rag::answer::AnswerConfig;
    use crate::rag::embeddings::Embedder;
    use crate::types::{AppError, ExternalError};
    use async_trait::async_trait;
    use quire_vector::{DistanceMetric, Record, VectorIndex, VectorMetadata};
    use std::time::Duration;

    struct Unit;

    #[async_trait]
    impl Embedder for Unit {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, ExternalError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "unit"
        }
    }

    struct EchoSystem;

    #[async_trait]
    impl LLMClient for EchoSystem {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> std::result::Result<String, ExternalError> {
            Ok(request.system.clone())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn service(handle: IndexHandle) -> QaService {
        let retriever = Retriever::new(Arc::new(Unit), 4, Duration::from_secs(5)).unwrap();
        let engine = AnswerEngine::new(Arc::new(EchoSystem), AnswerConfig::default()).unwrap();
        QaService::new(Arc::new(handle), retriever, engine, HistoryPolicy::Lenient)
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let index = VectorIndex::from_records(
            2,
            DistanceMetric::Cosine,
            [Record::new("a", vec![1.0, 0.0], "The sky is blue.", VectorMetadata::new())],
        )
        .unwrap();
        let answer = service(IndexHandle::ready(index))
            .answer("What color is the sky?", &[])
            .await
            .unwrap();
        assert!(answer.contains("The sky is blue."));
    }

    #[tokio::test]
    async fn test_unavailable_index() {
        let result = service(IndexHandle::unavailable("missing"))
            .answer("anything", &[])
            .await;
        assert!(matches!(result, Err(AppError::IndexUnavailable(_))));
    }
}
