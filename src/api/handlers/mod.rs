//! API request handlers.

/// Question answering.
pub mod chat;
/// Service and index status.
pub mod health;
