//! # Retrying ML Service Client
//!
//! HTTP client for the ML prediction service. Every operation runs the same
//! per-call protocol:
//!
//! 1. Consult the circuit breaker; when it denies, fail fast with
//!    [`MlClientError::CircuitOpen`] and make no network attempt.
//! 2. Send the request, retrying transport errors and 5xx responses with
//!    exponential backoff (100ms doubling per retry). 4xx and decodable 2xx
//!    responses are never retried.
//! 3. Report the terminal outcome to the breaker: success on a decoded 2xx,
//!    failure on 4xx or an exhausted retry budget. A 2xx with an undecodable
//!    body is terminal but records nothing on the breaker.
//!
//! Connection pooling is a fixed resource policy configured once at
//! construction; dropping the client releases pooled connections.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::client::error::{MlClientError, MlClientResult};
use crate::client::types::{
    HealthResponse, PatternDetectionRequest, PatternDetectionResponse, PredictionRequest,
    PredictionResponse, QueryFeatures, TrainModelRequest, TrainModelResponse,
    TrainingStatusResponse, ValidatePredictionRequest, ValidatePredictionResponse,
};
use crate::config::MlServiceConfig;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};

const SERVICE_NAME: &str = "ml-service";

/// JSON-over-HTTP client for the ML service with breaker + retry resilience
#[derive(Debug, Clone)]
pub struct MlServiceClient {
    client: reqwest::Client,
    base_url: Url,
    config: MlServiceConfig,
    breaker: Arc<CircuitBreaker>,
}

impl MlServiceClient {
    /// Create a client with the default breaker thresholds
    pub fn new(config: MlServiceConfig) -> MlClientResult<Self> {
        Self::with_breaker_config(config, CircuitBreakerConfig::default())
    }

    /// Create a client with explicit breaker thresholds (tests tune these)
    pub fn with_breaker_config(
        config: MlServiceConfig,
        breaker_config: CircuitBreakerConfig,
    ) -> MlClientResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| MlClientError::config_error(format!("Invalid ML service URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool.idle_timeout_seconds))
            .build()
            .map_err(|e| MlClientError::config_error(format!("Failed to create HTTP client: {e}")))?;

        info!(
            base_url = %config.base_url,
            timeout_ms = config.timeout_ms,
            max_retries = config.max_retries,
            pool_max_idle_per_host = config.pool.max_idle_per_host,
            "Created ML service client"
        );

        Ok(Self {
            client,
            base_url,
            config,
            breaker: Arc::new(CircuitBreaker::new(SERVICE_NAME.to_string(), breaker_config)),
        })
    }

    /// Submit a performance-model training job
    ///
    /// POST /api/train/performance-model
    pub async fn train_performance_model(
        &self,
        request: &TrainModelRequest,
    ) -> MlClientResult<TrainModelResponse> {
        debug!(
            model_type = %request.model_type,
            server_id = %request.server_id,
            "Submitting model training job"
        );
        self.execute_with_retry(Method::POST, "/api/train/performance-model", Some(request))
            .await
    }

    /// Poll a training job's progress
    ///
    /// GET /api/train/performance-model/{job_id}
    pub async fn get_training_status(&self, job_id: &str) -> MlClientResult<TrainingStatusResponse> {
        let path = format!("/api/train/performance-model/{job_id}");
        self.execute_with_retry(Method::GET, &path, None::<&()>).await
    }

    /// Request an execution-time prediction for one query
    ///
    /// POST /api/predict/query-execution
    pub async fn predict_query_execution(
        &self,
        query_id: &str,
        features: &QueryFeatures,
    ) -> MlClientResult<PredictionResponse> {
        let request = PredictionRequest {
            query_id: query_id.to_string(),
            features: features.clone(),
        };
        self.execute_with_retry(Method::POST, "/api/predict/query-execution", Some(&request))
            .await
    }

    /// Report an observed execution time for accuracy tracking
    ///
    /// POST /api/validate/prediction
    pub async fn validate_prediction(
        &self,
        request: &ValidatePredictionRequest,
    ) -> MlClientResult<ValidatePredictionResponse> {
        self.execute_with_retry(Method::POST, "/api/validate/prediction", Some(request))
            .await
    }

    /// Run workload pattern detection for one server
    ///
    /// POST /api/detect/patterns
    pub async fn detect_workload_patterns(
        &self,
        request: &PatternDetectionRequest,
    ) -> MlClientResult<PatternDetectionResponse> {
        self.execute_with_retry(Method::POST, "/api/detect/patterns", Some(request))
            .await
    }

    /// Check ML service liveness
    ///
    /// GET /api/health. Never surfaces an error: any terminal failure has
    /// already been recorded on the breaker and reads as `false` here.
    pub async fn is_healthy(&self) -> bool {
        match self
            .execute_with_retry::<(), HealthResponse>(Method::GET, "/api/health", None)
            .await
        {
            Ok(response) => {
                debug!(status = %response.status, "ML service health check succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "ML service health check failed");
                false
            }
        }
    }

    /// Current breaker state string for observability
    pub fn circuit_breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Breaker metrics snapshot for observability endpoints
    pub fn circuit_breaker_metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    /// Resilience envelope shared by every operation
    async fn execute_with_retry<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> MlClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !self.breaker.calls_allowed() {
            debug!(path = %path, "Circuit breaker rejected ML service call");
            return Err(MlClientError::CircuitOpen {
                service: SERVICE_NAME.to_string(),
            });
        }

        let url = self
            .base_url
            .join(path)
            .map_err(|e| MlClientError::config_error(format!("Failed to construct URL: {e}")))?;

        let mut attempts: u32 = 0;
        let mut backoff = self.config.initial_backoff();
        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            attempts += 1;
            let last_error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return match response.json::<T>().await {
                            Ok(parsed) => {
                                self.breaker.record_success();
                                Ok(parsed)
                            }
                            // The network round-trip succeeded; a broken body
                            // is a contract violation, not a breaker failure
                            Err(e) => {
                                error!(url = %url, error = %e, "Failed to decode ML service response");
                                Err(MlClientError::Decode(e))
                            }
                        };
                    }

                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    // Client errors are semantic rejections, never retried
                    if status.is_client_error() {
                        error!(url = %url, status = %status, error = %message, "ML service rejected request");
                        self.breaker.record_failure();
                        return Err(MlClientError::api_error(status.as_u16(), message));
                    }

                    warn!(
                        url = %url,
                        status = %status,
                        attempt = attempts,
                        max_retries = self.config.max_retries,
                        "Server error from ML service, will retry"
                    );
                    format!("HTTP {}: {}", status.as_u16(), message)
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        error = %e,
                        attempt = attempts,
                        max_retries = self.config.max_retries,
                        "Network error calling ML service, will retry"
                    );
                    e.to_string()
                }
            };

            // First attempt plus max_retries retries
            if attempts > self.config.max_retries {
                error!(
                    url = %url,
                    attempts,
                    "Exhausted all retries for ML service call"
                );
                self.breaker.record_failure();
                return Err(MlClientError::MaxRetriesExceeded {
                    attempts,
                    last_error,
                });
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}
