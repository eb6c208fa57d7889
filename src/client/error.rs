//! # ML Client Error Types
//!
//! Error taxonomy for calls to the ML service. Each variant already encodes
//! which resilience bucket a failure falls into, so API-level callers can map
//! errors to response codes without string matching.

use thiserror::Error;

/// ML client operation result type
pub type MlClientResult<T> = Result<T, MlClientError>;

/// Errors surfaced by ML service calls
#[derive(Debug, Error)]
pub enum MlClientError {
    /// Circuit breaker rejected the call before any network attempt
    #[error("Circuit breaker is open for {service}")]
    CircuitOpen { service: String },

    /// Retry budget exhausted without a successful response
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    /// Remote rejection or server error surfaced with its status and body
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx response whose body could not be decoded
    #[error("Invalid response format: {0}")]
    Decode(#[source] reqwest::Error),

    /// Transport-level failure on a non-retried path
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MlClientError {
    /// Create an API error from an HTTP response
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the error is recoverable (worth retrying later)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            MlClientError::CircuitOpen { .. } => true,
            MlClientError::MaxRetriesExceeded { .. } => true,
            MlClientError::Api { status, .. } => *status >= 500,
            MlClientError::Http(e) => e.is_timeout() || e.is_connect(),
            // The network succeeded but the server sent garbage; retrying
            // will not fix a broken contract
            MlClientError::Decode(_) => false,
            MlClientError::Config(_) => false,
        }
    }

    /// HTTP status an API-level caller should answer with
    ///
    /// "Try later" conditions map to 503, remote 4xx rejections pass through,
    /// and undecodable upstream responses map to 502.
    #[must_use]
    pub fn response_status(&self) -> u16 {
        match self {
            MlClientError::CircuitOpen { .. } | MlClientError::MaxRetriesExceeded { .. } => 503,
            MlClientError::Api { status, .. } if *status < 500 => *status,
            MlClientError::Api { .. } => 503,
            MlClientError::Decode(_) => 502,
            MlClientError::Http(_) => 502,
            MlClientError::Config(_) => 500,
        }
    }
}
