//! Integration tests for the retrying ML client against a local mock server.
//!
//! Covers the failure-classification contract: 5xx and transport errors are
//! retried with backoff, 4xx is terminal, and exactly one breaker outcome is
//! recorded per logical call.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pgfleet_core::client::{
    MlClientError, MlServiceClient, PredictionResponse, QueryFeatures, TrainModelRequest,
};
use pgfleet_core::config::{HttpPoolConfig, MlServiceConfig};
use pgfleet_core::resilience::{CircuitBreakerConfig, CircuitState};

#[derive(Clone)]
struct MockState {
    hits: Arc<AtomicUsize>,
    /// Number of leading requests answered with HTTP 500
    fail_first: usize,
    /// When set, every request is answered with this status
    always_status: Option<StatusCode>,
    /// When set, successful responses carry this raw body instead of JSON
    raw_body: Option<&'static str>,
}

impl MockState {
    fn new(fail_first: usize) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            fail_first,
            always_status: None,
            raw_body: None,
        }
    }

    fn always(status: StatusCode) -> Self {
        Self {
            always_status: Some(status),
            ..Self::new(0)
        }
    }

    fn garbage_body() -> Self {
        Self {
            raw_body: Some("not json at all"),
            ..Self::new(0)
        }
    }

    fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn mock_predict(State(state): State<MockState>) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = state.always_status {
        return (status, "mock rejection").into_response();
    }
    if hit < state.fail_first {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mock outage").into_response();
    }
    if let Some(body) = state.raw_body {
        return (StatusCode::OK, body).into_response();
    }

    Json(PredictionResponse {
        query_id: "q-1".to_string(),
        predicted_execution_time_ms: 14.2,
        confidence_lower_ms: 11.0,
        confidence_upper_ms: 19.5,
        model_version: "v3".to_string(),
    })
    .into_response()
}

async fn mock_health(State(state): State<MockState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = state.always_status {
        return (status, "down").into_response();
    }
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

async fn spawn_mock_server(state: MockState) -> String {
    let router = Router::new()
        .route("/api/predict/query-execution", post(mock_predict))
        .route("/api/train/performance-model", post(mock_predict))
        .route("/api/health", get(mock_health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_config(base_url: &str) -> MlServiceConfig {
    MlServiceConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2000,
        max_retries: 3,
        initial_backoff_ms: 1,
        pool: HttpPoolConfig {
            max_idle_per_host: 2,
            idle_timeout_seconds: 5,
        },
    }
}

fn sample_features() -> QueryFeatures {
    QueryFeatures {
        query_id: "q-1".to_string(),
        avg_execution_time_ms: 12.0,
        calls_per_minute: 200.0,
        mean_rows_returned: 55.0,
        shared_blocks_hit_ratio: 0.93,
        temp_blocks_written: 0.0,
        planner_cost: 642.5,
        table_count: 2,
        join_count: 1,
    }
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let state = MockState::new(2);
    let base_url = spawn_mock_server(state.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();

    let prediction = client
        .predict_query_execution("q-1", &sample_features())
        .await
        .unwrap();

    assert_eq!(prediction.model_version, "v3");
    // Two failed attempts plus the successful third
    assert_eq!(state.hit_count(), 3);

    // One logical call records exactly one breaker success, no failures
    let metrics = client.circuit_breaker_metrics();
    assert_eq!(metrics.total_successes, 1);
    assert_eq!(metrics.total_failures, 0);
    assert_eq!(metrics.state, CircuitState::Closed);
}

#[tokio::test]
async fn exhausted_retries_surface_distinct_error() {
    let state = MockState::always(StatusCode::INTERNAL_SERVER_ERROR);
    let base_url = spawn_mock_server(state.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();

    let err = client
        .predict_query_execution("q-1", &sample_features())
        .await
        .unwrap_err();

    match err {
        MlClientError::MaxRetriesExceeded { attempts, ref last_error } => {
            assert_eq!(attempts, 4); // first attempt + 3 retries
            assert!(last_error.contains("HTTP 500"));
        }
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
    assert_eq!(state.hit_count(), 4);
    assert_eq!(client.circuit_breaker_metrics().total_failures, 1);
}

#[tokio::test]
async fn client_errors_are_never_retried() {
    let state = MockState::always(StatusCode::BAD_REQUEST);
    let base_url = spawn_mock_server(state.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();

    let err = client
        .predict_query_execution("q-1", &sample_features())
        .await
        .unwrap_err();

    match err {
        MlClientError::Api { status, ref message } => {
            assert_eq!(status, 400);
            assert!(message.contains("mock rejection"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    // Zero retries and exactly one breaker failure
    assert_eq!(state.hit_count(), 1);
    assert_eq!(client.circuit_breaker_metrics().total_failures, 1);
}

#[tokio::test]
async fn breaker_opens_and_fails_fast_without_network() {
    let state = MockState::always(StatusCode::BAD_REQUEST);
    let base_url = spawn_mock_server(state.clone()).await;
    let breaker_config = CircuitBreakerConfig {
        failure_threshold: 2,
        ..CircuitBreakerConfig::default()
    };
    let client =
        MlServiceClient::with_breaker_config(client_config(&base_url), breaker_config).unwrap();

    for _ in 0..2 {
        let _ = client
            .train_performance_model(&TrainModelRequest {
                model_type: "performance".to_string(),
                server_id: "pg-1".to_string(),
                window_hours: 24,
            })
            .await;
    }
    assert_eq!(client.circuit_breaker_state(), CircuitState::Open);
    assert_eq!(state.hit_count(), 2);

    // With the circuit open, the next call makes no network attempt
    let err = client
        .predict_query_execution("q-1", &sample_features())
        .await
        .unwrap_err();
    assert!(matches!(err, MlClientError::CircuitOpen { .. }));
    assert_eq!(state.hit_count(), 2);
}

#[tokio::test]
async fn decode_failure_is_terminal_and_not_a_breaker_outcome() {
    let state = MockState::garbage_body();
    let base_url = spawn_mock_server(state.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();

    let err = client
        .predict_query_execution("q-1", &sample_features())
        .await
        .unwrap_err();

    assert!(matches!(err, MlClientError::Decode(_)));
    assert_eq!(state.hit_count(), 1);

    let metrics = client.circuit_breaker_metrics();
    assert_eq!(metrics.total_successes, 0);
    assert_eq!(metrics.total_failures, 0);
}

#[tokio::test]
async fn health_check_never_errors() {
    let healthy = MockState::new(0);
    let base_url = spawn_mock_server(healthy.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();
    assert!(client.is_healthy().await);
    assert_eq!(client.circuit_breaker_metrics().total_successes, 1);

    let unhealthy = MockState::always(StatusCode::SERVICE_UNAVAILABLE);
    let base_url = spawn_mock_server(unhealthy.clone()).await;
    let client = MlServiceClient::new(client_config(&base_url)).unwrap();
    assert!(!client.is_healthy().await);
    assert_eq!(client.circuit_breaker_metrics().total_failures, 1);
}
