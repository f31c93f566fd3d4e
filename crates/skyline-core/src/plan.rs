//! Explicit execution plans: caller-specified (feature, method) steps.
use serde::{Deserialize, Serialize};

/// One literal step of an explicit plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub feature_name: String,
    pub method_name: String,
}

/// Immutable ordered list of steps, consumed strictly in sequence and
/// executed fail-fast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<ExecutionStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, feature: impl Into<String>, method: impl Into<String>) -> Self {
        self.steps.push(ExecutionStep {
            feature_name: feature.into(),
            method_name: method.into(),
        });
        self
    }

    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl From<Vec<ExecutionStep>> for Plan {
    fn from(steps: Vec<ExecutionStep>) -> Self {
        Self { steps }
    }
}
