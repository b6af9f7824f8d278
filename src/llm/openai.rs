use crate::llm::client::{GenerationRequest, LLMClient};
use crate::types::{AppError, ExternalError, FailureKind, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Build an HTTP client that authenticates every request with `api_key`.
pub(crate) fn http_client(api_key: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| AppError::Configuration("API key contains invalid characters".into()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// POST `body` to `url` and decode the JSON reply, classifying failures.
pub(crate) async fn post_json<B, T>(
    client: &Client,
    url: &str,
    body: &B,
) -> std::result::Result<T, ExternalError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(classify_transport)?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(ExternalError::from_status(status.as_u16(), body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ExternalError::new(FailureKind::Malformed, format!("undecodable response: {}", e)))
}

fn classify_transport(err: reqwest::Error) -> ExternalError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_builder() {
        FailureKind::InvalidRequest
    } else {
        FailureKind::Unavailable
    };
    ExternalError::new(kind, err.to_string())
}

/// Chat Completions client for OpenAI and compatible APIs.
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        Ok(Self {
            client: http_client(&api_key)?,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model,
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ExternalError> {
        let messages = request.messages();
        let body = CompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
        };

        let response: CompletionResponse = post_json(&self.client, &self.endpoint, &body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ExternalError::new(FailureKind::Malformed, "No response from OpenAI"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
