//! Chat model providers.
//!
//! [`LLMClient`] is the generator capability the answer engine depends on.
//! Concrete providers are compiled in with Cargo features:
//! - `openai` - OpenAI Chat Completions and compatible endpoints
//! - `ollama` - a local Ollama server
//!
//! ```ignore
//! use quire::llm::{LLMClientFactory, Provider};
//!
//! let factory = LLMClientFactory::new(Provider::OpenAI {
//!     api_key: std::env::var("OPENAI_API_KEY")?,
//!     api_base: "https://api.openai.com/v1".to_string(),
//!     model: "gpt-3.5-turbo".to_string(),
//! });
//! let client = factory.create_default()?;
//! ```

/// Core generator trait, request types and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{ChatMessage, GenerationRequest, LLMClient, LLMClientFactory, Provider, Role};
