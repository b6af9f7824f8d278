//! TOML-based configuration for quire
//!
//! Everything the server and the offline indexer need is read from a single
//! `quire.toml`. Every field has a default, so an empty file is a valid
//! configuration for a local OpenAI-backed setup. Credentials are never
//! stored in the file; providers name the environment variable holding them.

use crate::llm::Provider;
use crate::memory::HistoryPolicy;
use crate::rag::answer::{AnswerConfig, DEFAULT_SYSTEM_PROMPT, CONTEXT_PLACEHOLDER};
use crate::rag::embeddings::EmbedderProvider;
use crate::rag::index::BuildOptions;
use crate::types::AppError;
use quire_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from quire.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuireConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat model used to answer questions
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model used for both indexing and retrieval
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub answer: AnswerSettings,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Time box for every embedding and generation call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmConfig {
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_chat_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            model: default_chat_model(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn temperature(&self) -> f32 {
        match self {
            LlmConfig::OpenAI { temperature, .. } | LlmConfig::Ollama { temperature, .. } => {
                *temperature
            }
        }
    }
}

// ============= Embeddings Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingProviderConfig {
    OpenAI {
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_embedding_model")]
        model: String,
        #[serde(default = "default_dimensions")]
        dimensions: usize,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
        dimensions: usize,
    },
    /// Local ONNX models, requires the `local-embeddings` feature
    FastEmbed {
        #[serde(default = "default_local_model")]
        model: String,
    },
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_local_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        EmbeddingProviderConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(flatten)]
    pub provider: EmbeddingProviderConfig,

    /// Chunks per embedding call during index builds
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding calls in flight during index builds
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_batch_size() -> usize {
    64
}

fn default_concurrency() -> usize {
    2
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderConfig::default(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Source document; pages separated by form feeds
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,

    /// Directory holding the index snapshot
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_document_path() -> PathBuf {
    PathBuf::from("data/document.txt")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/index")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
        }
    }
}

// ============= Answer Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSettings {
    /// Must contain `{context}`
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// 0 forwards the whole history
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    #[serde(default)]
    pub history_policy: HistoryPolicy,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_history_turns() -> usize {
    crate::memory::DEFAULT_MAX_HISTORY_TURNS
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history_turns: default_max_history_turns(),
            history_policy: HistoryPolicy::default(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl QuireConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without checking values or environment variables
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError("rag.chunk_size must be > 0".into()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::ValidationError("rag.top_k must be >= 1".into()));
        }

        if self.embeddings.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embeddings.batch_size must be >= 1".into(),
            ));
        }
        if self.embeddings.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "embeddings.concurrency must be >= 1".into(),
            ));
        }
        match &self.embeddings.provider {
            EmbeddingProviderConfig::OpenAI { dimensions, .. }
            | EmbeddingProviderConfig::Ollama { dimensions, .. }
                if *dimensions == 0 =>
            {
                return Err(ConfigError::ValidationError(
                    "embeddings.dimensions must be >= 1".into(),
                ));
            }
            _ => {}
        }

        let temperature = self.llm.temperature();
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        if !self.answer.system_prompt.contains(CONTEXT_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "answer.system_prompt must contain {}",
                CONTEXT_PLACEHOLDER
            )));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "server.request_timeout_secs must be > 0".into(),
            ));
        }

        for env in self.referenced_env_vars() {
            self.validate_env_var(env)?;
        }

        Ok(())
    }

    /// Names of environment variables holding credentials
    pub fn referenced_env_vars(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        if let LlmConfig::OpenAI { api_key_env, .. } = &self.llm {
            vars.push(api_key_env.as_str());
        }
        if let EmbeddingProviderConfig::OpenAI { api_key_env, .. } = &self.embeddings.provider {
            if !vars.contains(&api_key_env.as_str()) {
                vars.push(api_key_env.as_str());
            }
        }
        vars
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    fn resolve_env(&self, name: &str) -> Result<String, ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Generator provider with credentials resolved from the environment
    pub fn llm_provider(&self) -> Result<Provider, ConfigError> {
        Ok(match &self.llm {
            LlmConfig::OpenAI {
                api_key_env,
                api_base,
                model,
                ..
            } => Provider::OpenAI {
                api_key: self.resolve_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            },
            LlmConfig::Ollama {
                base_url, model, ..
            } => Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            },
        })
    }

    /// Embedder provider with credentials resolved from the environment
    pub fn embedder_provider(&self) -> Result<EmbedderProvider, ConfigError> {
        Ok(match &self.embeddings.provider {
            EmbeddingProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
                dimensions,
            } => EmbedderProvider::OpenAI {
                api_key: self.resolve_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
                dimensions: *dimensions,
            },
            EmbeddingProviderConfig::Ollama {
                base_url,
                model,
                dimensions,
            } => EmbedderProvider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
                dimensions: *dimensions,
            },
            EmbeddingProviderConfig::FastEmbed { model } => EmbedderProvider::FastEmbed {
                model: model.clone(),
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn answer_config(&self) -> AnswerConfig {
        AnswerConfig {
            system_prompt: self.answer.system_prompt.clone(),
            temperature: self.llm.temperature(),
            max_history_turns: self.answer.max_history_turns,
            timeout: self.request_timeout(),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            batch_size: self.embeddings.batch_size,
            concurrency: self.embeddings.concurrency,
            metric: self.rag.metric,
            timeout: self.request_timeout(),
        }
    }
}
