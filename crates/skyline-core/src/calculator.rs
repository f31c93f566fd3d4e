//! Calculator contract and the static registration table.
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::context::Context;
use crate::error::EngineError;
use crate::registry::FeatureRegistry;

#[derive(Error, Debug, Clone)]
pub enum CalculationError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid input {name}: {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("{0}")]
    Failed(String),
}

pub type CalcResult = Result<Value, CalculationError>;

/// One calculator serves every configured method of a single feature.
///
/// Methods take no call arguments: all inputs are read from the [`Context`],
/// and the engine stores the returned value under the feature name. A
/// returned [`Value::Null`] counts as "no value" and is recorded as a
/// failure.
pub trait Calculator: Send + Sync {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult;
}

type Factory = Arc<dyn Fn() -> Arc<dyn Calculator> + Send + Sync>;

/// Registration table mapping feature name to a calculator factory.
///
/// Bindings are fixed at startup; the engine constructs instances lazily
/// and caches them for its own lifetime.
#[derive(Clone, Default)]
pub struct CalculatorSet {
    factories: HashMap<String, Factory>,
}

impl CalculatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, C>(&mut self, feature: impl Into<String>, factory: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Calculator + 'static,
    {
        self.factories
            .insert(feature.into(), Arc::new(move || Arc::new(factory())));
    }

    pub fn build(&self, feature: &str) -> Option<Arc<dyn Calculator>> {
        self.factories.get(feature).map(|factory| factory())
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.factories.contains_key(feature)
    }

    /// Checks that every registry feature has a calculator bound. Run this
    /// at startup so a missing binding fails before any run starts.
    pub fn validate(&self, registry: &FeatureRegistry) -> Result<(), EngineError> {
        let mut missing: Vec<String> = registry
            .feature_names()
            .filter(|name| !self.factories.contains_key(*name))
            .map(str::to_string)
            .collect();
        missing.sort();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Configuration(format!(
                "no calculator registered for: {missing:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct FixedCalculator;

    impl Calculator for FixedCalculator {
        fn invoke(&self, method: &str, _ctx: &Context) -> CalcResult {
            match method {
                "fixed" => Ok(json!(42)),
                other => Err(CalculationError::UnknownMethod(other.to_string())),
            }
        }
    }

    #[test]
    fn register_and_build() {
        let mut set = CalculatorSet::new();
        set.register("answer", FixedCalculator::default);

        assert!(set.contains("answer"));
        let calculator = set.build("answer").unwrap();
        assert_eq!(calculator.invoke("fixed", &Context::new()).unwrap(), json!(42));
        assert!(set.build("unknown").is_none());
    }

    #[test]
    fn unknown_method_is_an_error() {
        let calculator = FixedCalculator;
        let err = calculator.invoke("nope", &Context::new()).unwrap_err();
        assert!(matches!(err, CalculationError::UnknownMethod(_)));
    }

    #[test]
    fn validate_flags_unbound_features() {
        let registry = FeatureRegistry::from_json(
            r#"{ "features": { "building_area": {}, "building_height": {} } }"#,
        )
        .unwrap();

        let mut set = CalculatorSet::new();
        set.register("building_area", FixedCalculator::default);

        let err = set.validate(&registry).unwrap_err();
        assert!(err.to_string().contains("building_height"));

        set.register("building_height", FixedCalculator::default);
        assert!(set.validate(&registry).is_ok());
    }
}
