//! Per-run key/value store shared by the engine and its calculators.
use std::collections::HashMap;

use serde_json::Value;

/// Mutable store holding run identifiers, raw inputs and computed feature
/// values for a single run. Caller-provided inputs and computed results are
/// indistinguishable once set, so an external input can satisfy a declared
/// dependency directly.
#[derive(Debug, Clone)]
pub struct Context {
    run_id: String,
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            values: HashMap::new(),
        }
    }

    /// Context pre-seeded with the usual run identifiers.
    pub fn for_run(project_id: &str, scenario_id: &str, building_id: Option<&str>) -> Self {
        let mut ctx = Self::new();
        ctx.set("project_id", Value::String(project_id.to_string()));
        ctx.set("scenario_id", Value::String(scenario_id.to_string()));
        if let Some(building_id) = building_id {
            ctx.set("building_id", Value::String(building_id.to_string()));
        }
        ctx
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Unconditionally overwrites any previous value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// True iff a value has been set for `key`, whether computed or
    /// caller-provided.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn merge(&mut self, entries: HashMap<String, Value>) {
        for (key, value) in entries {
            self.values.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_has() {
        let mut ctx = Context::new();
        assert!(!ctx.has("building_height"));

        ctx.set("building_height", json!(12.5));
        assert!(ctx.has("building_height"));
        assert_eq!(ctx.get("building_height"), Some(&json!(12.5)));
    }

    #[test]
    fn set_overwrites() {
        let mut ctx = Context::new();
        ctx.set("building_height", json!(12.5));
        ctx.set("building_height", json!(30.0));
        assert_eq!(ctx.get("building_height"), Some(&json!(30.0)));
    }

    #[test]
    fn for_run_seeds_identifiers() {
        let ctx = Context::for_run("p1", "s1", Some("b1"));
        assert_eq!(ctx.get("project_id"), Some(&json!("p1")));
        assert_eq!(ctx.get("scenario_id"), Some(&json!("s1")));
        assert_eq!(ctx.get("building_id"), Some(&json!("b1")));
        assert!(!ctx.run_id().is_empty());
    }

    #[test]
    fn merge_adds_entries() {
        let mut ctx = Context::new();
        ctx.set("a", json!(1));

        let mut extra = HashMap::new();
        extra.insert("b".to_string(), json!(2));
        ctx.merge(extra);

        assert!(ctx.has("a"));
        assert_eq!(ctx.get("b"), Some(&json!(2)));
    }
}
