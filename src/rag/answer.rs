//! Prompt assembly and the generator call.

use crate::llm::{GenerationRequest, LLMClient};
use crate::memory::{truncate_history, DEFAULT_MAX_HISTORY_TURNS};
use crate::rag::time_box;
use crate::types::{AppError, Result, Turn};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Placeholder replaced by the retrieved context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the following context:\n\n{context}\n\nIf the information is not in the context, say that you don't know.";

#[derive(Debug, Clone)]
pub struct AnswerConfig {
    /// Must contain [`CONTEXT_PLACEHOLDER`].
    pub system_prompt: String,
    pub temperature: f32,
    /// Most recent turns forwarded to the generator; `0` forwards all.
    pub max_history_turns: usize,
    pub timeout: Duration,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct AnswerEngine {
    generator: Arc<dyn LLMClient>,
    config: AnswerConfig,
}

impl AnswerEngine {
    pub fn new(generator: Arc<dyn LLMClient>, config: AnswerConfig) -> Result<Self> {
        if !config.system_prompt.contains(CONTEXT_PLACEHOLDER) {
            return Err(AppError::Configuration(format!(
                "system prompt must contain {}",
                CONTEXT_PLACEHOLDER
            )));
        }
        Ok(Self { generator, config })
    }

    /// Assemble the generation request. Pure: identical inputs give an
    /// identical request.
    pub fn build_request(&self, question: &str, history: &[Turn], context: &str) -> GenerationRequest {
        GenerationRequest {
            system: self.config.system_prompt.replace(CONTEXT_PLACEHOLDER, context),
            history: truncate_history(history, self.config.max_history_turns).to_vec(),
            question: question.to_string(),
            temperature: self.config.temperature,
        }
    }

    /// Ask the generator once. Failures are surfaced as
    /// [`AppError::Generation`] and never retried here.
    #[instrument(skip_all, fields(model = self.generator.model_name(), turns = history.len(), context_len = context.len()))]
    pub async fn answer(&self, question: &str, history: &[Turn], context: &str) -> Result<String> {
        let request = self.build_request(question, history, context);

        let reply = time_box(self.config.timeout, "generation", self.generator.generate(&request))
            .await
            .map_err(AppError::Generation)?;

        debug!(reply_len = reply.len(), "Generator replied");
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExternalError, FailureKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<GenerationRequest>>,
        fail_with: Option<FailureKind>,
    }

    #[async_trait]
    impl LLMClient for Recording {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> std::result::Result<String, ExternalError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.fail_with {
                Some(kind) => Err(ExternalError::new(kind, "scripted")),
                None => Ok("  The sky is blue.\n".to_string()),
            }
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn engine(generator: Arc<Recording>, max_history_turns: usize) -> AnswerEngine {
        AnswerEngine::new(
            generator,
            AnswerConfig {
                max_history_turns,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_request_embeds_context_and_history() {
        let engine = engine(Arc::new(Recording::default()), 20);
        let history = vec![Turn::new("hi", "hello")];
        let request = engine.build_request("What color is the sky?", &history, "The sky is blue.");

        assert!(request.system.contains("The sky is blue."));
        assert!(!request.system.contains(CONTEXT_PLACEHOLDER));
        assert!(request.system.contains("don't know"));
        assert_eq!(request.history, history);
        assert_eq!(request.question, "What color is the sky?");
        assert_eq!(request.temperature, 0.7);

        let again = engine.build_request("What color is the sky?", &history, "The sky is blue.");
        assert_eq!(request, again);
    }

    #[test]
    fn test_history_is_bounded_to_recent_turns() {
        let engine = engine(Arc::new(Recording::default()), 1);
        let history = vec![Turn::new("Q1", "A1"), Turn::new("Q2", "A2")];
        let request = engine.build_request("Q3", &history, "");
        assert_eq!(request.history, vec![Turn::new("Q2", "A2")]);
    }

    #[tokio::test]
    async fn test_answer_calls_generator_once_and_trims() {
        let generator = Arc::new(Recording::default());
        let engine = engine(Arc::clone(&generator), 20);

        let answer = engine.answer("Q", &[], "ctx").await.unwrap();
        assert_eq!(answer, "The sky is blue.");
        assert_eq!(generator.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_classified_and_not_retried() {
        let generator = Arc::new(Recording {
            fail_with: Some(FailureKind::RateLimited),
            ..Default::default()
        });
        let engine = engine(Arc::clone(&generator), 20);

        let err = engine.answer("Q", &[], "").await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(err.is_retryable());
        assert_eq!(generator.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_prompt_without_placeholder_rejected() {
        let result = AnswerEngine::new(
            Arc::new(Recording::default()),
            AnswerConfig {
                system_prompt: "no slot".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
