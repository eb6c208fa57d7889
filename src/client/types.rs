//! # ML Service Wire Types
//!
//! Flat JSON request/response pairs for the ML service HTTP API. Field names
//! follow the service's snake_case contract.

use serde::{Deserialize, Serialize};

/// Numeric features extracted from one query's runtime statistics
///
/// This is both the prediction request payload and the value type of the
/// feature cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFeatures {
    pub query_id: String,
    pub avg_execution_time_ms: f64,
    pub calls_per_minute: f64,
    pub mean_rows_returned: f64,
    pub shared_blocks_hit_ratio: f64,
    pub temp_blocks_written: f64,
    /// Planner cost estimate from the most recent EXPLAIN
    pub planner_cost: f64,
    pub table_count: u32,
    pub join_count: u32,
}

/// Request to train the performance model: POST /api/train/performance-model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainModelRequest {
    pub model_type: String,
    pub server_id: String,
    /// Hours of historical metrics to build the training window from
    pub window_hours: u32,
}

/// Training job acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainModelResponse {
    pub job_id: String,
    pub status: String,
}

/// Training job progress: GET /api/train/performance-model/{job_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingStatusResponse {
    pub job_id: String,
    pub status: String,
    /// Completed fraction in [0.0, 1.0]
    pub progress: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request for an execution-time prediction: POST /api/predict/query-execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub query_id: String,
    pub features: QueryFeatures,
}

/// Predicted execution time with confidence bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub query_id: String,
    pub predicted_execution_time_ms: f64,
    pub confidence_lower_ms: f64,
    pub confidence_upper_ms: f64,
    pub model_version: String,
}

/// Report an observed execution for accuracy tracking: POST /api/validate/prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePredictionRequest {
    pub query_id: String,
    pub predicted_execution_time_ms: f64,
    pub actual_execution_time_ms: f64,
}

/// Prediction accuracy result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePredictionResponse {
    pub query_id: String,
    pub error_percent: f64,
    pub within_confidence: bool,
}

/// Request workload pattern detection: POST /api/detect/patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDetectionRequest {
    pub server_id: String,
    pub window_hours: u32,
}

/// Detected workload patterns for a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDetectionResponse {
    pub server_id: String,
    pub patterns: Vec<WorkloadPattern>,
}

/// One detected workload pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadPattern {
    pub pattern_type: String,
    pub confidence: f64,
    pub description: String,
}

/// Service liveness: GET /api/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_request_wire_shape() {
        let request = PredictionRequest {
            query_id: "q-123".to_string(),
            features: QueryFeatures {
                query_id: "q-123".to_string(),
                avg_execution_time_ms: 12.5,
                calls_per_minute: 480.0,
                mean_rows_returned: 42.0,
                shared_blocks_hit_ratio: 0.97,
                temp_blocks_written: 0.0,
                planner_cost: 1834.2,
                table_count: 3,
                join_count: 2,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query_id"], "q-123");
        assert_eq!(json["features"]["planner_cost"], 1834.2);
        assert_eq!(json["features"]["join_count"], 2);
    }

    #[test]
    fn test_training_status_tolerates_missing_error_field() {
        let response: TrainingStatusResponse = serde_json::from_str(
            r#"{"job_id":"job-1","status":"running","progress":0.4}"#,
        )
        .unwrap();
        assert_eq!(response.status, "running");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_pattern_response_decodes_list() {
        let response: PatternDetectionResponse = serde_json::from_str(
            r#"{
                "server_id": "pg-7",
                "patterns": [
                    {"pattern_type": "batch_window", "confidence": 0.91, "description": "Nightly bulk load between 02:00-03:00"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.patterns.len(), 1);
        assert_eq!(response.patterns[0].pattern_type, "batch_window");
    }
}
