//! # Structured Error Handling
//!
//! Crate-level error type shared by configuration, caching, and the web
//! boundary. The ML client carries its own richer taxonomy in
//! [`crate::client::MlClientError`].

use thiserror::Error;

/// Crate operation result type
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors raised by the fleet-monitoring core outside the ML client path
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Feature extraction failed for {query_id}: {reason}")]
    FeatureExtraction { query_id: String, reason: String },

    #[error("ML service error: {0}")]
    MlService(#[from] crate::client::MlClientError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FleetError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError(message.into())
    }

    /// Create a feature extraction error
    pub fn feature_extraction(query_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FeatureExtraction {
            query_id: query_id.into(),
            reason: reason.into(),
        }
    }
}
