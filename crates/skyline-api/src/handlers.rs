//! API handlers: one engine per request, built from the shared state.
use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use skyline_core::{EngineError, PipelineExecutor, Plan, ENGINE_VERSION};

use crate::schemas::{
    ExplicitPipelineRequest, FeatureRequest, FeatureResponse, PipelineRequest,
    PipelineResponse, PredefinedPipelineRequest,
};
use crate::AppState;

pub async fn execute_pipeline(
    State(state): State<AppState>,
    Json(req): Json<PipelineRequest>,
) -> Response {
    let engine = state.engine_for(
        &req.project_id,
        &req.scenario_id,
        req.building_id.as_deref(),
        req.input_data,
    );

    match engine.execute_pipeline(&req.features, req.parallel).await {
        Ok(outcome) => {
            let results = collect_results(&engine, &outcome.requested_features);
            (StatusCode::OK, Json(PipelineResponse { outcome, results })).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn execute_explicit_pipeline(
    State(state): State<AppState>,
    Json(req): Json<ExplicitPipelineRequest>,
) -> Response {
    let engine = state.engine_for(
        &req.project_id,
        &req.scenario_id,
        req.building_id.as_deref(),
        req.input_data,
    );

    let plan = Plan::from(req.execution_plan);
    let outcome = engine.execute_explicit_pipeline(&plan);
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn execute_predefined_pipeline(
    State(state): State<AppState>,
    Json(req): Json<PredefinedPipelineRequest>,
) -> Response {
    let engine = state.engine_for(&req.project_id, &req.scenario_id, req.building_id.as_deref(), None);

    let extra_inputs = req.input_data.unwrap_or_default();
    match engine
        .execute_predefined_pipeline(&req.pipeline_name, extra_inputs)
        .await
    {
        Ok(outcome) => {
            let results = collect_results(&engine, &outcome.requested_features);
            (StatusCode::OK, Json(PipelineResponse { outcome, results })).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn calculate_feature(
    State(state): State<AppState>,
    Json(req): Json<FeatureRequest>,
) -> Response {
    let engine = state.engine_for(
        &req.project_id,
        &req.scenario_id,
        req.building_id.as_deref(),
        req.input_data,
    );

    let result = engine.execute_feature(&req.feature_name, req.method_name.as_deref());
    let summary = engine.execution_summary();
    let record = summary.execution_details.get(&req.feature_name);

    let response = FeatureResponse {
        success: result.is_ok(),
        feature_name: req.feature_name.clone(),
        value: engine.feature_value(&req.feature_name),
        method_used: record.and_then(|r| r.method_name.clone()),
        error: result.err().map(|e| e.to_string()),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn list_features(State(state): State<AppState>) -> Response {
    let mut features: Vec<&str> = state.registry().feature_names().collect();
    features.sort_unstable();
    let mut pipelines: Vec<&str> = state.registry().pipeline_names().collect();
    pipelines.sort_unstable();

    (
        StatusCode::OK,
        Json(json!({ "features": features, "predefined_pipelines": pipelines })),
    )
        .into_response()
}

pub async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": ENGINE_VERSION })),
    )
        .into_response()
}

fn collect_results(engine: &PipelineExecutor, features: &[String]) -> HashMap<String, Value> {
    features
        .iter()
        .filter_map(|f| engine.feature_value(f).map(|v| (f.clone(), v)))
        .collect()
}

fn error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::Configuration(_) => StatusCode::BAD_REQUEST,
        EngineError::CycleDetected(_) | EngineError::StuckSchedule(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, "pipeline request failed");
    (
        status,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}
