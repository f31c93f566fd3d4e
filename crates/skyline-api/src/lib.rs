//! Skyline API: REST surface over the pipeline engine.
pub mod handlers;
pub mod schemas;

use std::collections::HashMap;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use skyline_core::{CalculatorSet, Context, EngineError, FeatureRegistry, PipelineExecutor};
use tower_http::trace::TraceLayer;

/// Registry and calculator bindings shared by every request.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<FeatureRegistry>,
    calculators: Arc<CalculatorSet>,
}

impl AppState {
    /// Built-in registry and calculators. Bindings are validated here so a
    /// missing calculator fails the boot, not a run.
    pub fn builtin() -> Result<Self, EngineError> {
        Self::new(
            skyline_calculators::default_registry(),
            skyline_calculators::builtin_set(),
        )
    }

    pub fn new(
        registry: FeatureRegistry,
        calculators: CalculatorSet,
    ) -> Result<Self, EngineError> {
        calculators.validate(&registry)?;
        Ok(Self {
            registry: Arc::new(registry),
            calculators: Arc::new(calculators),
        })
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// One engine per request: a run owns its context exclusively.
    pub fn engine_for(
        &self,
        project_id: &str,
        scenario_id: &str,
        building_id: Option<&str>,
        input_data: Option<HashMap<String, Value>>,
    ) -> PipelineExecutor {
        let mut context = Context::for_run(project_id, scenario_id, building_id);
        if let Some(inputs) = input_data {
            context.merge(inputs);
        }
        PipelineExecutor::new(self.registry.clone(), self.calculators.clone(), context)
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/pipeline", post(handlers::execute_pipeline))
        .route(
            "/v1/pipeline/explicit",
            post(handlers::execute_explicit_pipeline),
        )
        .route(
            "/v1/pipeline/predefined",
            post(handlers::execute_predefined_pipeline),
        )
        .route("/v1/feature", post(handlers::calculate_feature))
        .route("/v1/registry/features", get(handlers::list_features))
        .route("/v1/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str) {
    let state = AppState::builtin().expect("builtin calculator bindings are complete");
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    tracing::info!("skyline API listening on {}", addr);
    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_state_validates() {
        AppState::builtin().unwrap();
    }

    #[test]
    fn engine_for_seeds_identifiers_and_inputs() {
        let state = AppState::builtin().unwrap();
        let mut inputs = HashMap::new();
        inputs.insert("dsm_sample".to_string(), json!([10.0]));

        let engine = state.engine_for("p1", "s1", Some("b1"), Some(inputs));
        assert_eq!(engine.feature_value("project_id"), Some(json!("p1")));
        assert_eq!(engine.feature_value("building_id"), Some(json!("b1")));
        assert!(engine.has_feature("dsm_sample"));
    }
}
