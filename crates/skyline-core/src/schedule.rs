//! Dependency closure, topological ordering and level grouping.
//!
//! Pure functions over the registry; the executor layers context state and
//! calculator invocation on top of these.
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::EngineError;
use crate::registry::FeatureRegistry;

/// Transitive closure of the features needed to produce `targets`, in
/// discovery order.
///
/// Dependency names without a registry entry are leaf inputs (satisfied
/// from the context, nothing to execute) and are not expanded. Targets
/// themselves are kept even when unconfigured so the executor can report a
/// per-feature configuration failure instead of dropping them silently.
pub fn required_features(registry: &FeatureRegistry, targets: &[String]) -> Vec<String> {
    let mut required: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = targets.iter().cloned().collect();

    while let Some(feature) = queue.pop_front() {
        if !seen.insert(feature.clone()) {
            continue;
        }
        required.push(feature.clone());

        if let Some(spec) = registry.feature(&feature) {
            for method in &spec.methods {
                for dep in &method.input_dependencies {
                    if registry.feature(dep).is_some() && !seen.contains(dep.as_str()) {
                        queue.push_back(dep.clone());
                    }
                }
            }
        }
    }

    required
}

/// Kahn's algorithm over the required set.
///
/// Edges run dependency → dependent, restricted to the required set; a
/// dependency declared by several methods of one feature counts as a single
/// edge. Ties resolve in input order, so the result is deterministic for a
/// given `required` ordering. A cycle is a hard error.
pub fn topological_order(
    registry: &FeatureRegistry,
    required: &[String],
) -> Result<Vec<String>, EngineError> {
    let in_set: HashSet<&str> = required.iter().map(String::as_str).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> =
        required.iter().map(|f| (f.as_str(), 0)).collect();

    for feature in required {
        if let Some(spec) = registry.feature(feature) {
            let mut counted: HashSet<&str> = HashSet::new();
            for method in &spec.methods {
                for dep in &method.input_dependencies {
                    if in_set.contains(dep.as_str()) && counted.insert(dep.as_str()) {
                        successors.entry(dep.as_str()).or_default().push(feature);
                        *in_degree
                            .get_mut(feature.as_str())
                            .expect("feature seeded above") += 1;
                    }
                }
            }
        }
    }

    let mut queue: VecDeque<&str> = required
        .iter()
        .map(String::as_str)
        .filter(|f| in_degree[f] == 0)
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(required.len());

    while let Some(feature) = queue.pop_front() {
        order.push(feature.to_string());
        if let Some(dependents) = successors.get(feature) {
            for dependent in dependents {
                let degree = in_degree
                    .get_mut(dependent)
                    .expect("dependent seeded above");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != required.len() {
        let cyclic: Vec<String> = required
            .iter()
            .filter(|f| in_degree[f.as_str()] > 0)
            .cloned()
            .collect();
        tracing::error!(features = ?cyclic, "circular dependency in required set");
        return Err(EngineError::CycleDetected(cyclic));
    }

    Ok(order)
}

/// Groups an ordered required set into batches of mutually independent
/// features.
///
/// A feature joins the current level when at least one of its methods has
/// every in-set dependency already calculated — by a prior level or because
/// the value was pre-seeded into the context (`precomputed`). A pass that
/// schedules nothing while features remain means the configuration cannot
/// make progress.
pub fn level_groups(
    registry: &FeatureRegistry,
    ordered: &[String],
    precomputed: &HashSet<String>,
) -> Result<Vec<Vec<String>>, EngineError> {
    let in_set: HashSet<&str> = ordered.iter().map(String::as_str).collect();
    let mut calculated: HashSet<String> = precomputed.clone();
    let mut remaining: Vec<&str> = ordered.iter().map(String::as_str).collect();
    let mut levels: Vec<Vec<String>> = Vec::new();

    while !remaining.is_empty() {
        let mut level: Vec<String> = Vec::new();

        for feature in &remaining {
            let eligible = match registry.feature(feature) {
                Some(spec) => spec.methods.iter().any(|method| {
                    method
                        .input_dependencies
                        .iter()
                        .filter(|dep| in_set.contains(dep.as_str()))
                        .all(|dep| calculated.contains(dep.as_str()))
                }),
                // Unconfigured feature: nothing to wait on, the executor
                // reports the configuration failure.
                None => true,
            };
            if eligible {
                level.push((*feature).to_string());
            }
        }

        if level.is_empty() {
            let stuck: Vec<String> = remaining.iter().map(|f| f.to_string()).collect();
            tracing::error!(features = ?stuck, "level grouping made no progress");
            return Err(EngineError::StuckSchedule(stuck));
        }

        remaining.retain(|f| !level.iter().any(|scheduled| scheduled == f));
        for feature in &level {
            calculated.insert(feature.clone());
        }
        levels.push(level);
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(raw: &str) -> FeatureRegistry {
        FeatureRegistry::from_json(raw).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const CHAIN: &str = r#"{
        "features": {
            "a": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["b"] } ] },
            "b": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["c"] } ] },
            "c": { "methods": [ { "method_name": "m", "priority": 1 } ] }
        }
    }"#;

    #[test]
    fn closure_follows_dependencies() {
        let registry = registry(CHAIN);
        let required = required_features(&registry, &names(&["a"]));
        assert_eq!(required, names(&["a", "b", "c"]));
    }

    #[test]
    fn closure_does_not_expand_leaf_inputs() {
        let registry = registry(
            r#"{
            "features": {
                "building_height": {
                    "methods": [ {
                        "method_name": "calculate_from_raster",
                        "priority": 1,
                        "input_dependencies": ["dsm_sample", "dtm_sample"]
                    } ]
                }
            }
        }"#,
        );
        let required = required_features(&registry, &names(&["building_height"]));
        assert_eq!(required, names(&["building_height"]));
    }

    #[test]
    fn closure_keeps_unconfigured_targets() {
        let registry = registry(CHAIN);
        let required = required_features(&registry, &names(&["bogus"]));
        assert_eq!(required, names(&["bogus"]));
    }

    #[test]
    fn order_puts_dependencies_first() {
        let registry = registry(CHAIN);
        let required = required_features(&registry, &names(&["a"]));
        let order = topological_order(&registry, &required).unwrap();

        let pos = |f: &str| order.iter().position(|o| o == f).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn duplicate_dependency_across_methods_is_one_edge() {
        let registry = registry(
            r#"{
            "features": {
                "x": { "methods": [
                    { "method_name": "m1", "priority": 1, "input_dependencies": ["y"] },
                    { "method_name": "m2", "priority": 2, "input_dependencies": ["y"] }
                ] },
                "y": { "methods": [ { "method_name": "m", "priority": 1 } ] }
            }
        }"#,
        );
        let order = topological_order(&registry, &names(&["x", "y"])).unwrap();
        assert_eq!(order, names(&["y", "x"]));
    }

    #[test]
    fn cycle_is_a_hard_error() {
        let registry = registry(
            r#"{
            "features": {
                "a": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["b"] } ] },
                "b": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["a"] } ] }
            }
        }"#,
        );
        let err = topological_order(&registry, &names(&["a", "b"])).unwrap_err();
        match err {
            EngineError::CycleDetected(features) => {
                assert_eq!(features.len(), 2);
            }
            other => panic!("expected CycleDetected, got {other}"),
        }
    }

    const DIAMOND: &str = r#"{
        "features": {
            "a": { "methods": [ { "method_name": "m", "priority": 1 } ] },
            "b": { "methods": [ { "method_name": "m", "priority": 1 } ] },
            "c": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["a", "b"] } ] }
        }
    }"#;

    #[test]
    fn independent_branches_share_a_level() {
        let registry = registry(DIAMOND);
        let order = topological_order(&registry, &names(&["a", "b", "c"])).unwrap();
        let levels = level_groups(&registry, &order, &HashSet::new()).unwrap();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0], names(&["a", "b"]));
        assert_eq!(levels[1], names(&["c"]));
    }

    #[test]
    fn precomputed_values_unlock_dependents() {
        let registry = registry(DIAMOND);
        let order = names(&["a", "b", "c"]);
        let precomputed: HashSet<String> = names(&["a", "b"]).into_iter().collect();

        let levels = level_groups(&registry, &order, &precomputed).unwrap();
        // Everything is eligible at once: a and b are memoized no-ops and c's
        // inputs already exist.
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0], names(&["a", "b", "c"]));
    }

    #[test]
    fn no_progress_is_a_stuck_schedule() {
        // b's only method waits on a feature that is in the set but can
        // itself never be scheduled first (mutual wait).
        let registry = registry(
            r#"{
            "features": {
                "a": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["b"] } ] },
                "b": { "methods": [ { "method_name": "m", "priority": 1, "input_dependencies": ["a"] } ] }
            }
        }"#,
        );
        let err = level_groups(&registry, &names(&["a", "b"]), &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::StuckSchedule(_)));
    }
}
