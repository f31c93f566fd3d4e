//! Pipeline executor: memoized feature execution with priority fallback,
//! pipeline orchestration, and level-parallel scheduling.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::calculator::{Calculator, CalculatorSet};
use crate::context::Context;
use crate::error::EngineError;
use crate::outcome::{ExecutionRecord, ExecutionSummary, PipelineOutcome, PlanOutcome};
use crate::plan::Plan;
use crate::registry::{FeatureRegistry, MethodSpec};
use crate::schedule;

/// Worker pool size for one parallel level.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Drives one run over one [`Context`].
///
/// Cloning is cheap and shares the same context, calculator cache and
/// results, which is what the level-parallel path relies on. An executor is
/// never shared between independently initiated runs.
#[derive(Clone)]
pub struct PipelineExecutor {
    registry: Arc<FeatureRegistry>,
    calculators: Arc<CalculatorSet>,
    context: Arc<RwLock<Context>>,
    cache: Arc<Mutex<HashMap<String, Arc<dyn Calculator>>>>,
    results: Arc<Mutex<HashMap<String, ExecutionRecord>>>,
    max_workers: usize,
}

impl PipelineExecutor {
    pub fn new(
        registry: Arc<FeatureRegistry>,
        calculators: Arc<CalculatorSet>,
        context: Context,
    ) -> Self {
        Self {
            registry,
            calculators,
            context: Arc::new(RwLock::new(context)),
            cache: Arc::new(Mutex::new(HashMap::new())),
            results: Arc::new(Mutex::new(HashMap::new())),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    // --- context access ---

    pub fn set_input(&self, key: impl Into<String>, value: Value) {
        self.ctx_write().set(key, value);
    }

    pub fn merge_inputs(&self, entries: HashMap<String, Value>) {
        self.ctx_write().merge(entries);
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.ctx_read().has(name)
    }

    pub fn feature_value(&self, name: &str) -> Option<Value> {
        self.ctx_read().get(name).cloned()
    }

    pub fn run_id(&self) -> String {
        self.ctx_read().run_id().to_string()
    }

    // --- single feature ---

    /// Computes a single feature, memoized against the context.
    ///
    /// With `explicit_method` the exact method must exist and have all of
    /// its inputs present; otherwise methods are tried ascending by
    /// priority, skipping those whose inputs are missing, until one
    /// succeeds. Every failure is recorded and returned, never panicked.
    pub fn execute_feature(
        &self,
        feature: &str,
        explicit_method: Option<&str>,
    ) -> Result<(), EngineError> {
        if self.has_feature(feature) {
            tracing::debug!(%feature, "already calculated");
            return Ok(());
        }

        let spec = match self.registry.feature(feature) {
            Some(spec) => spec,
            None => {
                let err =
                    EngineError::Configuration(format!("feature {feature} is not configured"));
                tracing::error!(%feature, "no configuration for feature");
                self.record_failure(feature, None, &err, 0);
                return Err(err);
            }
        };

        let calculator = match self.calculator_for(feature) {
            Ok(calculator) => calculator,
            Err(err) => {
                tracing::error!(%feature, error = %err, "calculator binding failed");
                self.record_failure(feature, None, &err, 0);
                return Err(err);
            }
        };

        if let Some(method_name) = explicit_method {
            let method = match spec.method(method_name) {
                Some(method) => method,
                None => {
                    let err = EngineError::MethodNotFound {
                        feature: feature.to_string(),
                        method: method_name.to_string(),
                    };
                    tracing::error!(%feature, method = %method_name, "method not declared");
                    self.record_failure(feature, Some(method_name), &err, 0);
                    return Err(err);
                }
            };

            let missing = self.missing_deps(method);
            if !missing.is_empty() {
                let err = EngineError::DependencyUnsatisfied {
                    feature: feature.to_string(),
                    method: method_name.to_string(),
                    missing,
                };
                tracing::error!(%feature, method = %method_name, error = %err, "dependencies not satisfied");
                self.record_failure(feature, Some(method_name), &err, 0);
                return Err(err);
            }

            return self.invoke_method(&calculator, feature, method);
        }

        let mut attempted = false;
        for method in spec.methods_by_priority() {
            let missing = self.missing_deps(method);
            if !missing.is_empty() {
                tracing::debug!(
                    %feature,
                    method = %method.method_name,
                    missing = ?missing,
                    "skipping method, inputs not ready"
                );
                continue;
            }
            attempted = true;
            if self.invoke_method(&calculator, feature, method).is_ok() {
                return Ok(());
            }
        }

        let err = EngineError::NoSuitableMethod(feature.to_string());
        tracing::error!(%feature, "no suitable method");
        if !attempted {
            // Otherwise the last attempt's record already carries the detail.
            self.record_failure(feature, None, &err, 0);
        }
        Err(err)
    }

    // --- pipelines ---

    /// Resolves the closure of `targets`, orders it, and executes it either
    /// sequentially or level-parallel.
    ///
    /// Per-feature failures are recorded and the walk continues; only
    /// scheduling failures (`CycleDetected`, `StuckSchedule`) abort the run.
    pub async fn execute_pipeline(
        &self,
        targets: &[String],
        parallel: bool,
    ) -> Result<PipelineOutcome, EngineError> {
        let required = schedule::required_features(&self.registry, targets);
        let order = schedule::topological_order(&self.registry, &required)?;
        tracing::info!(
            run_id = %self.run_id(),
            targets = targets.len(),
            resolved = order.len(),
            parallel,
            "executing pipeline"
        );

        let mut outcome = PipelineOutcome {
            success: false,
            requested_features: targets.to_vec(),
            executed_features: Vec::new(),
            failed_features: Vec::new(),
            execution_order: order.clone(),
            levels: None,
            pipeline_name: None,
            pipeline_description: None,
        };

        if parallel {
            self.execute_levels(&order, &mut outcome).await?;
        } else {
            for feature in &order {
                match self.execute_feature(feature, None) {
                    Ok(()) => outcome.executed_features.push(feature.clone()),
                    Err(_) => outcome.failed_features.push(feature.clone()),
                }
            }
        }

        let ctx = self.ctx_read();
        outcome.success = targets.iter().all(|f| ctx.has(f));
        Ok(outcome)
    }

    /// Runs a literal plan, stopping at the first failing step.
    pub fn execute_explicit_pipeline(&self, plan: &Plan) -> PlanOutcome {
        let mut outcome = PlanOutcome {
            success: true,
            ..PlanOutcome::default()
        };

        for step in plan.steps() {
            let label = format!("{}.{}", step.feature_name, step.method_name);
            match self.execute_feature(&step.feature_name, Some(&step.method_name)) {
                Ok(()) => {
                    if let Some(value) = self.feature_value(&step.feature_name) {
                        outcome.results.insert(step.feature_name.clone(), value);
                    }
                    outcome.executed_steps.push(label);
                }
                Err(_) => {
                    outcome.failed_steps.push(label);
                    outcome.success = false;
                    // Fail-fast: remaining steps are not attempted.
                    break;
                }
            }
        }

        outcome
    }

    /// Looks up a configured pipeline, merges `extra_inputs` into the
    /// context, and runs it with its configured parallel flag.
    pub async fn execute_predefined_pipeline(
        &self,
        name: &str,
        extra_inputs: HashMap<String, Value>,
    ) -> Result<PipelineOutcome, EngineError> {
        let pipeline = match self.registry.pipeline(name) {
            Some(pipeline) => pipeline.clone(),
            None => {
                return Err(EngineError::Configuration(format!(
                    "pipeline {name} is not configured"
                )));
            }
        };

        self.merge_inputs(extra_inputs);

        let mut outcome = self
            .execute_pipeline(&pipeline.features, pipeline.parallel)
            .await?;
        outcome.pipeline_name = Some(name.to_string());
        outcome.pipeline_description = Some(pipeline.description.clone());
        Ok(outcome)
    }

    // --- reporting ---

    pub fn execution_summary(&self) -> ExecutionSummary {
        let results = self.results_lock();
        let successful = results.values().filter(|r| r.success).count();
        ExecutionSummary {
            total_executions: results.len(),
            successful_executions: successful,
            failed_executions: results.len() - successful,
            execution_details: results.clone(),
        }
    }

    /// Drops cached calculator instances and past results. Computed context
    /// values stay: the run's data outlives the bookkeeping.
    pub fn clear_cache(&self) {
        self.cache.lock().expect("calculator cache lock poisoned").clear();
        self.results_lock().clear();
    }

    // --- internals ---

    async fn execute_levels(
        &self,
        order: &[String],
        outcome: &mut PipelineOutcome,
    ) -> Result<(), EngineError> {
        let precomputed: HashSet<String> = {
            let ctx = self.ctx_read();
            order.iter().filter(|f| ctx.has(f)).cloned().collect()
        };
        let levels = schedule::level_groups(&self.registry, order, &precomputed)?;
        outcome.levels = Some(levels.clone());

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        for (index, level) in levels.iter().enumerate() {
            tracing::info!(level = index, features = level.len(), "executing level");

            let mut tasks = Vec::with_capacity(level.len());
            for feature in level {
                let engine = self.clone();
                let feature = feature.clone();
                let semaphore = semaphore.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("worker semaphore closed");
                    engine.execute_feature(&feature, None).is_ok()
                }));
            }

            // The whole level drains before the next one starts.
            for (slot, joined) in join_all(tasks).await.into_iter().enumerate() {
                let feature = level[slot].clone();
                match joined {
                    Ok(true) => outcome.executed_features.push(feature),
                    Ok(false) => outcome.failed_features.push(feature),
                    Err(join_err) => {
                        tracing::error!(%feature, error = %join_err, "feature task panicked");
                        outcome.failed_features.push(feature);
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns the cached calculator for `feature`, constructing it on
    /// first use. The cache lock is held through construction, so two
    /// workers never build the same calculator twice.
    fn calculator_for(&self, feature: &str) -> Result<Arc<dyn Calculator>, EngineError> {
        let mut cache = self.cache.lock().expect("calculator cache lock poisoned");
        if let Some(calculator) = cache.get(feature) {
            return Ok(calculator.clone());
        }

        let calculator = self.calculators.build(feature).ok_or_else(|| {
            EngineError::Configuration(format!("no calculator registered for feature {feature}"))
        })?;
        cache.insert(feature.to_string(), calculator.clone());
        Ok(calculator)
    }

    fn missing_deps(&self, method: &MethodSpec) -> Vec<String> {
        let ctx = self.ctx_read();
        method
            .input_dependencies
            .iter()
            .filter(|dep| !ctx.has(dep))
            .cloned()
            .collect()
    }

    /// Runs one configured method, stores the value on success, and records
    /// the attempt either way. Calculator failures stop here.
    fn invoke_method(
        &self,
        calculator: &Arc<dyn Calculator>,
        feature: &str,
        method: &MethodSpec,
    ) -> Result<(), EngineError> {
        let method_name = method.method_name.as_str();
        tracing::info!(%feature, method = %method_name, "executing method");
        let started = Instant::now();

        let result = {
            let ctx = self.ctx_read();
            calculator.invoke(method_name, &ctx)
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Value::Null) => {
                let err = EngineError::Calculation {
                    feature: feature.to_string(),
                    method: method_name.to_string(),
                    message: "method returned no value".to_string(),
                };
                tracing::warn!(%feature, method = %method_name, "method returned no value");
                self.record_failure(feature, Some(method_name), &err, elapsed_ms);
                Err(err)
            }
            Ok(value) => {
                self.ctx_write().set(feature, value.clone());
                tracing::info!(%feature, method = %method_name, elapsed_ms, "calculated");
                self.record_success(feature, method_name, value, elapsed_ms);
                Ok(())
            }
            Err(calc_err) => {
                let err = EngineError::Calculation {
                    feature: feature.to_string(),
                    method: method_name.to_string(),
                    message: calc_err.to_string(),
                };
                tracing::warn!(%feature, method = %method_name, error = %calc_err, "method failed");
                self.record_failure(feature, Some(method_name), &err, elapsed_ms);
                Err(err)
            }
        }
    }

    fn record_success(&self, feature: &str, method: &str, value: Value, elapsed_ms: u64) {
        self.results_lock().insert(
            feature.to_string(),
            ExecutionRecord {
                feature_name: feature.to_string(),
                method_name: Some(method.to_string()),
                success: true,
                value: Some(value),
                error: None,
                elapsed_ms,
                finished_at: Utc::now(),
            },
        );
    }

    fn record_failure(
        &self,
        feature: &str,
        method: Option<&str>,
        error: &EngineError,
        elapsed_ms: u64,
    ) {
        self.results_lock().insert(
            feature.to_string(),
            ExecutionRecord {
                feature_name: feature.to_string(),
                method_name: method.map(str::to_string),
                success: false,
                value: None,
                error: Some(error.to_string()),
                elapsed_ms,
                finished_at: Utc::now(),
            },
        );
    }

    fn ctx_read(&self) -> RwLockReadGuard<'_, Context> {
        self.context.read().expect("context lock poisoned")
    }

    fn ctx_write(&self) -> RwLockWriteGuard<'_, Context> {
        self.context.write().expect("context lock poisoned")
    }

    fn results_lock(&self) -> MutexGuard<'_, HashMap<String, ExecutionRecord>> {
        self.results.lock().expect("results lock poisoned")
    }
}
