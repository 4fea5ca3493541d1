use thiserror::Error;

/// Application-wide error types for zenmoji.
#[derive(Error, Debug)]
pub enum AppError {
    /// No usable article text could be extracted from the editor.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Too many suggestion requests inside the rate-limit window.
    #[error("Rate limit exceeded: too many requests, retry in a minute")]
    RateLimitExceeded,

    /// Provider answered with a non-2xx status.
    #[error("{provider} API error (HTTP {status}): {body}")]
    ProviderError {
        provider: String,
        status: u16,
        body: String,
    },

    /// Provider envelope contained no text payload.
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Parsed candidate does not satisfy the suggestion shape.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Missing or invalid configuration (API key, env vars, templates).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Key-value store read or write failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true if this error counts as a failed attempt that the
    /// retry loop may re-attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ProviderError { .. }
                | AppError::EmptyResponse(_)
                | AppError::ValidationError(_)
                | AppError::HttpError(_)
                | AppError::Timeout(_)
                | AppError::NetworkError(_)
                | AppError::SerializationError(_)
        )
    }
}
