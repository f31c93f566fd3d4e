//! Skyline core: feature registry model, dependency scheduling, and the
//! pipeline execution engine.
//!
//! A run asks for a set of target features; the engine expands them to the
//! full required set, orders that set topologically, and walks the order
//! invoking one calculator method per feature until the context holds a
//! value for it.
//!
//! # Execution Flow
//!
//! ```text
//! targets → closure → topological order → sequential walk | level pool
//!              ↓             ↓                      ↓
//!          registry     cycle check          context + results
//! ```

pub mod calculator;
pub mod context;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod plan;
pub mod registry;
pub mod schedule;

pub use calculator::{CalcResult, CalculationError, Calculator, CalculatorSet};
pub use context::Context;
pub use error::EngineError;
pub use executor::{PipelineExecutor, DEFAULT_MAX_WORKERS};
pub use outcome::{ExecutionRecord, ExecutionSummary, PipelineOutcome, PlanOutcome};
pub use plan::{ExecutionStep, Plan};
pub use registry::{FeatureRegistry, FeatureSpec, MethodSpec, PipelineSpec, DEFAULT_PRIORITY};

/// Engine version reported by the API health endpoint.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
