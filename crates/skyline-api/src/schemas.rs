//! Request and response shapes for the pipeline API.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skyline_core::{ExecutionStep, PipelineOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRequest {
    pub project_id: String,
    pub scenario_id: String,
    #[serde(default)]
    pub building_id: Option<String>,
    pub features: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub input_data: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplicitPipelineRequest {
    pub project_id: String,
    pub scenario_id: String,
    #[serde(default)]
    pub building_id: Option<String>,
    pub execution_plan: Vec<ExecutionStep>,
    #[serde(default)]
    pub input_data: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredefinedPipelineRequest {
    pub project_id: String,
    pub scenario_id: String,
    #[serde(default)]
    pub building_id: Option<String>,
    pub pipeline_name: String,
    #[serde(default)]
    pub input_data: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRequest {
    pub project_id: String,
    pub scenario_id: String,
    #[serde(default)]
    pub building_id: Option<String>,
    pub feature_name: String,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub input_data: Option<HashMap<String, Value>>,
}

/// Pipeline outcome plus the values of the requested features.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
    pub results: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureResponse {
    pub success: bool,
    pub feature_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pipeline_request_fills_defaults() {
        let req: PipelineRequest = serde_json::from_value(json!({
            "project_id": "p1",
            "scenario_id": "s1",
            "features": ["building_height"]
        }))
        .unwrap();

        assert!(req.building_id.is_none());
        assert!(!req.parallel);
        assert!(req.input_data.is_none());
    }

    #[test]
    fn explicit_request_parses_steps() {
        let req: ExplicitPipelineRequest = serde_json::from_value(json!({
            "project_id": "p1",
            "scenario_id": "s1",
            "execution_plan": [
                { "feature_name": "building_height", "method_name": "default_height" }
            ]
        }))
        .unwrap();

        assert_eq!(req.execution_plan.len(), 1);
        assert_eq!(req.execution_plan[0].feature_name, "building_height");
    }

    #[test]
    fn feature_response_skips_absent_fields() {
        let rendered = serde_json::to_value(FeatureResponse {
            success: true,
            feature_name: "building_height".to_string(),
            value: Some(json!(12.0)),
            method_used: None,
            error: None,
        })
        .unwrap();

        assert_eq!(rendered["value"], json!(12.0));
        assert!(rendered.get("method_used").is_none());
        assert!(rendered.get("error").is_none());
    }
}
