//! Static feature and pipeline configuration table.
//!
//! Loaded once before any run and immutable thereafter. The engine consumes
//! it purely as a dependency/priority lookup; how the table gets produced is
//! not its concern.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Methods without an explicit priority sort after every prioritized one.
pub const DEFAULT_PRIORITY: u32 = 999;

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

/// One candidate computation strategy for a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSpec {
    pub method_name: String,
    /// Lower values are tried first.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Feature names that must already be present in the context before
    /// this method may run. Names without a registry entry are leaf inputs.
    #[serde(default)]
    pub input_dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

impl FeatureSpec {
    /// Methods ascending by priority; declaration order breaks ties.
    pub fn methods_by_priority(&self) -> Vec<&MethodSpec> {
        let mut methods: Vec<&MethodSpec> = self.methods.iter().collect();
        methods.sort_by_key(|m| m.priority);
        methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.method_name == name)
    }
}

/// Named feature list executable as one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub description: String,
    pub features: Vec<String>,
    #[serde(rename = "async", default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureRegistry {
    #[serde(default)]
    features: HashMap<String, FeatureSpec>,
    #[serde(default)]
    predefined_pipelines: HashMap<String, PipelineSpec>,
}

impl FeatureRegistry {
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw)
            .map_err(|e| EngineError::Configuration(format!("registry parse: {e}")))
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.get(name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&PipelineSpec> {
        self.predefined_pipelines.get(name)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn pipeline_names(&self) -> impl Iterator<Item = &str> {
        self.predefined_pipelines.keys().map(String::as_str)
    }
}
