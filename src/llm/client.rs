//! Generator abstraction and provider selection
//!
//! Every chat model the server can talk to implements [`LLMClient`]:
//! - **OpenAI**: Chat Completions API and compatible endpoints
//! - **Ollama**: local models served by an Ollama instance

use crate::types::{AppError, ExternalError, Result, Turn};
use async_trait::async_trait;
use std::sync::Arc;

/// Chat model capability used by the answer engine.
///
/// Implementations perform exactly one remote call per [`generate`] and
/// never retry internally. Failures are classified so callers can tell a
/// transient outage from a permanent misconfiguration.
///
/// [`generate`]: LLMClient::generate
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Produce the assistant reply for a fully assembled request.
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ExternalError>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything the generator needs for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System instruction with the retrieved context already substituted.
    pub system: String,
    /// Prior turns, oldest first.
    pub history: Vec<Turn>,
    pub question: String,
    pub temperature: f32,
}

impl GenerationRequest {
    /// Flatten into `system, (user, assistant)*, user`.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2 + self.history.len() * 2);
        messages.push(ChatMessage::new(Role::System, self.system.as_str()));
        for turn in &self.history {
            messages.push(ChatMessage::new(Role::User, turn.question.as_str()));
            messages.push(ChatMessage::new(Role::Assistant, turn.answer.as_str()));
        }
        messages.push(ChatMessage::new(Role::User, self.question.as_str()));
        messages
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-3.5-turbo".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider was compiled out or its
    /// settings are unusable.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )?)),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url, model.clone())?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} support was not compiled in (enable the `{}` feature)",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Configuration-based client factory
///
/// ```rust,ignore
/// use quire::llm::{LLMClientFactory, Provider};
///
/// let factory = LLMClientFactory::new(Provider::Ollama {
///     base_url: "http://localhost:11434".to_string(),
///     model: "llama3.2".to_string(),
/// });
/// let client = factory.create_default()?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    /// Create a client using the default provider
    pub fn create_default(&self) -> Result<Arc<dyn LLMClient>> {
        self.default_provider.create_client()
    }

    /// Get a reference to the default provider
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}
