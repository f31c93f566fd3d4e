//! Unified error model for the pipeline engine.
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Unknown feature or pipeline name, or an unresolvable calculator binding.
    #[error("CONFIG/{0}")]
    Configuration(String),

    /// An explicitly requested method was invoked before its inputs existed.
    #[error("DEPS/{feature}.{method} missing inputs: {missing:?}")]
    DependencyUnsatisfied {
        feature: String,
        method: String,
        missing: Vec<String>,
    },

    /// An explicitly requested method is not declared for the feature.
    #[error("METHOD/{method} not declared for feature {feature}")]
    MethodNotFound { feature: String, method: String },

    /// Fallback exhausted every method without a satisfied, successful one.
    #[error("FALLBACK/no suitable method for feature {0}")]
    NoSuitableMethod(String),

    /// A calculator failed or returned no value.
    #[error("CALC/{feature}.{method}: {message}")]
    Calculation {
        feature: String,
        method: String,
        message: String,
    },

    /// The dependency graph has a cycle within the required feature set.
    #[error("CYCLE/circular dependency among features: {0:?}")]
    CycleDetected(Vec<String>),

    /// Level grouping made no progress while features remained.
    #[error("SCHED/no eligible feature while these remain: {0:?}")]
    StuckSchedule(Vec<String>),
}
