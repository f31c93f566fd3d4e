//! Structured execution outcomes returned to callers.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record of the last execution attempt for one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub feature_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Result of a resolved pipeline run.
///
/// `success` is computed over the originally requested targets only, not
/// the full closure; per-feature detail lives in the execution summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub requested_features: Vec<String>,
    pub executed_features: Vec<String>,
    pub failed_features: Vec<String>,
    pub execution_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_description: Option<String>,
}

/// Result of an explicit plan run. Steps are labeled `feature.method`; on
/// the first failure the remaining steps are never attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub success: bool,
    pub executed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub results: HashMap<String, Value>,
}

/// Counts plus full per-feature detail for everything the engine ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_executions: usize,
    pub successful_executions: usize,
    pub failed_executions: usize,
    pub execution_details: HashMap<String, ExecutionRecord>,
}
