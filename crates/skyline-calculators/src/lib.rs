//! Built-in calculators and the default feature configuration.
//!
//! The configuration table ships embedded so a caller can stand up a
//! working engine with `default_registry()` + `builtin_set()` and nothing
//! else. Teams with their own feature tables register their calculators on
//! a fresh [`CalculatorSet`] instead.

mod building;
mod census;
mod support;

pub use building::{
    AreaCalculator, FamiliesCalculator, FloorsCalculator, HeightCalculator,
    PopulationCalculator, TypeCalculator, VolumeCalculator,
};
pub use census::{CensusBoundaryCalculator, CensusPopulationCalculator};

use once_cell::sync::Lazy;
use skyline_core::{CalculatorSet, FeatureRegistry};

static DEFAULT_REGISTRY_RAW: &str = include_str!("../config/registry.json");

static DEFAULT_REGISTRY: Lazy<FeatureRegistry> = Lazy::new(|| {
    FeatureRegistry::from_json(DEFAULT_REGISTRY_RAW).expect("embedded registry is valid")
});

/// The feature and pipeline table shipped with the built-in calculators.
pub fn default_registry() -> FeatureRegistry {
    DEFAULT_REGISTRY.clone()
}

/// Registration table covering every feature in [`default_registry`].
pub fn builtin_set() -> CalculatorSet {
    let mut set = CalculatorSet::new();
    set.register("building_area", AreaCalculator::default);
    set.register("building_height", HeightCalculator::default);
    set.register("building_n_floors", FloorsCalculator::default);
    set.register("building_volume", VolumeCalculator::default);
    set.register("building_type", TypeCalculator::default);
    set.register("building_population", PopulationCalculator::default);
    set.register("building_n_families", FamiliesCalculator::default);
    set.register("scenario_census_boundary", CensusBoundaryCalculator::default);
    set.register("census_population", CensusPopulationCalculator::default);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyline_core::{CalculationError, Context};

    #[test]
    fn every_registry_feature_has_a_calculator() {
        builtin_set().validate(&default_registry()).unwrap();
    }

    #[test]
    fn every_configured_method_is_implemented() {
        let registry = default_registry();
        let set = builtin_set();
        let ctx = Context::new();

        for feature in registry.feature_names() {
            let calculator = set.build(feature).unwrap();
            for method in &registry.feature(feature).unwrap().methods {
                // With an empty context a wired-up method fails on missing
                // inputs (or succeeds, for defaults) but never on its name.
                if let Err(err) = calculator.invoke(&method.method_name, &ctx) {
                    assert!(
                        !matches!(err, CalculationError::UnknownMethod(_)),
                        "{feature}.{} is configured but not implemented",
                        method.method_name
                    );
                }
            }
        }
    }

    #[test]
    fn predefined_pipelines_reference_known_features() {
        let registry = default_registry();
        for pipeline_name in registry.pipeline_names() {
            let pipeline = registry.pipeline(pipeline_name).unwrap();
            for feature in &pipeline.features {
                assert!(
                    registry.feature(feature).is_some(),
                    "pipeline {pipeline_name} references unknown feature {feature}"
                );
            }
        }
    }
}
