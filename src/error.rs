//! Huginn error types

use crate::extract::FetchError;

/// Huginn error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum HuginnError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by completion provider")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    // Streaming errors
    #[error("stream error: {0}")]
    Stream(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no API key configured for the completion provider")]
    MissingApiKey,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Relay errors
    #[error("chat not found: {0}")]
    ChatNotFound(String),

    /// The queue worker has shut down and can no longer accept or
    /// complete entries.
    #[error("completion queue closed")]
    QueueClosed,

    // Page fetch errors
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl HuginnError {
    /// Whether the retry policy should try the call again.
    ///
    /// Only provider rate limiting is retried; every other failure is
    /// terminal at the point of detection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HuginnError::RateLimited)
    }
}

impl From<serde_json::Error> for HuginnError {
    fn from(err: serde_json::Error) -> Self {
        HuginnError::Json(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
