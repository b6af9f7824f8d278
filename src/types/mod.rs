use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Body of `POST /api/chat`.
///
/// The handler parses the raw body leniently (see [`crate::memory`]); this
/// type documents the expected shape and is what well-behaved clients send.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub question: String,
    /// Prior exchanges, oldest first, each `[question, answer]`.
    #[serde(default)]
    pub history: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Present for failures of an external service; `true` when retrying
    /// the same request later may succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when the index is loaded, `degraded` otherwise.
    pub status: String,
    pub index: IndexStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexStatus {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============= Conversation Types =============

/// One (question, answer) exchange of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

// ============= External Service Failures =============

/// Failure class of an embedding or generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The call did not finish within the configured time box.
    Timeout,
    /// The provider throttled the request (HTTP 429).
    RateLimited,
    /// Connection failure or provider-side error (5xx).
    Unavailable,
    /// Credentials missing, invalid or not permitted (401/403).
    Authentication,
    /// The provider rejected the request itself (other 4xx).
    InvalidRequest,
    /// The provider answered with something we could not use.
    Malformed,
}

impl FailureKind {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::RateLimited | FailureKind::Unavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Authentication => "authentication failed",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::Malformed => "malformed response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure reported by an external embedder or generator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExternalError {
    pub kind: FailureKind,
    pub message: String,
}

impl ExternalError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("{} did not complete within {:?}", operation, after),
        )
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Classify an HTTP status returned by a provider.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => FailureKind::Authentication,
            408 => FailureKind::Timeout,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::Unavailable,
            _ => FailureKind::InvalidRequest,
        };
        Self::new(kind, format!("HTTP {}: {}", status, body.into()))
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No content to index: {0}")]
    EmptyInput(String),

    #[error("Embedding error: {0}")]
    Embedding(ExternalError),

    #[error("Generation error: {0}")]
    Generation(ExternalError),

    #[error("Failed to load index: {0}")]
    IndexLoad(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The external failure behind this error, if any.
    pub fn external(&self) -> Option<&ExternalError> {
        match self {
            AppError::Embedding(e) | AppError::Generation(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        self.external().is_some_and(ExternalError::is_transient)
    }
}

impl From<quire_vector::Error> for AppError {
    fn from(err: quire_vector::Error) -> Self {
        use quire_vector::Error as E;
        match err {
            E::InvalidArgument(msg) => AppError::InvalidInput(msg),
            E::DimensionMismatch { expected, actual } => AppError::Configuration(format!(
                "embedding dimensionality {} does not match index dimensionality {}",
                actual, expected
            )),
            E::NotFound(_) | E::Corrupted(_) | E::Persistence(_) => {
                AppError::IndexLoad(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, retryable = self.is_retryable(), "Request failed");
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }

        let body = ErrorResponse {
            retryable: self.external().map(ExternalError::is_transient),
            error: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_classification() {
        assert_eq!(ExternalError::from_status(401, "").kind, FailureKind::Authentication);
        assert_eq!(ExternalError::from_status(403, "").kind, FailureKind::Authentication);
        assert_eq!(ExternalError::from_status(429, "").kind, FailureKind::RateLimited);
        assert_eq!(ExternalError::from_status(503, "").kind, FailureKind::Unavailable);
        assert_eq!(ExternalError::from_status(400, "").kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn test_transient_vs_permanent() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::RateLimited.is_transient());
        assert!(FailureKind::Unavailable.is_transient());
        assert!(!FailureKind::Authentication.is_transient());
        assert!(!FailureKind::InvalidRequest.is_transient());
        assert!(!FailureKind::Malformed.is_transient());
    }

    #[test]
    fn test_retryable_only_for_transient_external_errors() {
        let rate_limited = AppError::Generation(ExternalError::new(FailureKind::RateLimited, "slow down"));
        assert!(rate_limited.is_retryable());

        let auth = AppError::Generation(ExternalError::new(FailureKind::Authentication, "bad key"));
        assert!(!auth.is_retryable());

        assert!(!AppError::Internal("boom".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        let response = AppError::InvalidInput("missing question".into()).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

        let response = AppError::IndexUnavailable("not loaded".into()).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let response =
            AppError::Generation(ExternalError::timeout("generation", Duration::from_secs(1)))
                .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_vector_errors_map_to_taxonomy() {
        let err: AppError = quire_vector::Error::InvalidArgument("k must be >= 1".into()).into();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err: AppError = quire_vector::Error::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(matches!(err, AppError::Configuration(_)));

        let err: AppError = quire_vector::Error::Corrupted("checksum".into()).into();
        assert!(matches!(err, AppError::IndexLoad(_)));
    }
}
