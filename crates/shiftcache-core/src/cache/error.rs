use thiserror::Error;

use crate::error::ShiftError;
use crate::utils::truncate_string;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Missing required cache configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Unauthorized - check the cache access token")]
    Unauthorized,

    #[error("Rate limited by the cache backend")]
    RateLimited,

    #[error("Cache server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Command {command} failed: {message}")]
    Command { command: String, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl CacheError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = truncate_string(body, MAX_ERROR_BODY_LENGTH);
        match status.as_u16() {
            401 | 403 => CacheError::Unauthorized,
            429 => CacheError::RateLimited,
            500..=599 => CacheError::ServerError(truncated),
            _ => CacheError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::RateLimited | CacheError::ServerError(_) => true,
            CacheError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl From<CacheError> for ShiftError {
    fn from(e: CacheError) -> Self {
        ShiftError::CacheUnavailable(e.to_string())
    }
}
