//! # ML Service Client
//!
//! Retrying JSON-over-HTTP client for the external ML service that supplies
//! performance predictions. Every call runs the same resilience envelope:
//! consult the circuit breaker, retry transient failures with exponential
//! backoff, and report the terminal outcome back to the breaker.

pub mod error;
pub mod ml_client;
pub mod types;

pub use error::{MlClientError, MlClientResult};
pub use ml_client::MlServiceClient;
pub use types::{
    HealthResponse, PatternDetectionRequest, PatternDetectionResponse, PredictionRequest,
    PredictionResponse, QueryFeatures, TrainModelRequest, TrainModelResponse,
    TrainingStatusResponse, ValidatePredictionRequest, ValidatePredictionResponse,
    WorkloadPattern,
};
