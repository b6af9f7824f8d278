use crate::llm::client::{GenerationRequest, LLMClient, Role};
use crate::types::{AppError, ExternalError, FailureKind, Result};
use async_trait::async_trait;
use ollama_rs::{
    error::OllamaError,
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    models::ModelOptions,
    Ollama,
};

const DEFAULT_PORT: u16 = 11434;

/// Build an Ollama handle from a base URL such as `http://localhost:11434`.
pub(crate) fn connect(base_url: &str) -> Result<Ollama> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| AppError::Configuration(format!("invalid Ollama URL '{}': {}", base_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Configuration(format!(
            "Ollama URL '{}' must use http or https",
            base_url
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Configuration(format!("Ollama URL '{}' has no host", base_url)));
    }
    let port = resolve_port(&url);

    Ok(Ollama::builder().host(url).port(port).build())
}

/// Explicit port if given, else 11434 for plain http and the scheme default
/// otherwise (443 for https).
fn resolve_port(url: &reqwest::Url) -> u16 {
    match url.port() {
        Some(port) => port,
        None if url.scheme() == "http" => DEFAULT_PORT,
        None => url.port_or_known_default().unwrap_or(DEFAULT_PORT),
    }
}

/// Ollama reports everything as one error type; only a missing model is
/// worth singling out.
pub(crate) fn classify(err: OllamaError) -> ExternalError {
    let message = err.to_string();
    let kind = if message.contains("not found") {
        FailureKind::InvalidRequest
    } else {
        FailureKind::Unavailable
    };
    ExternalError::new(kind, format!("Ollama error: {}", message))
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        Ok(Self {
            client: connect(base_url)?,
            model,
        })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ExternalError> {
        let messages: Vec<ChatMessage> = request
            .messages()
            .into_iter()
            .map(|m| match m.role {
                Role::System => ChatMessage::system(m.content),
                Role::User => ChatMessage::user(m.content),
                Role::Assistant => ChatMessage::assistant(m.content),
            })
            .collect();

        let chat = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(request.temperature));

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(classify)?;

        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
