//! Configuration utilities.

/// `quire.toml` schema, loading and validation.
pub mod toml_config;
