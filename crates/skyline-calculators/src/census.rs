//! Scenario-level census calculators.
use serde_json::{json, Value};
use skyline_core::{CalcResult, CalculationError, Calculator, Context};

use crate::support;

#[derive(Default)]
pub struct CensusBoundaryCalculator;

impl CensusBoundaryCalculator {
    /// Bounding box of the scenario geometry as a GeoJSON polygon. Census
    /// zones are matched against this box rather than the exact outline.
    fn calculate_from_scenario(&self, ctx: &Context) -> CalcResult {
        let geo = support::require(ctx, "scenario_geo")?;
        let ring = support::footprint_ring(geo, "scenario_geo")?;
        let (min_x, min_y, max_x, max_y) = support::ring_bbox(&ring);

        Ok(json!({
            "type": "Polygon",
            "coordinates": [[
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
                [min_x, min_y]
            ]]
        }))
    }
}

impl Calculator for CensusBoundaryCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "calculate_from_scenario" => self.calculate_from_scenario(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct CensusPopulationCalculator;

impl CensusPopulationCalculator {
    /// Sums the population of census zones whose centroid falls inside the
    /// scenario census boundary.
    fn sum_census_zones(&self, ctx: &Context) -> CalcResult {
        let boundary = support::require(ctx, "scenario_census_boundary")?;
        let ring = support::footprint_ring(boundary, "scenario_census_boundary")?;
        let (min_x, min_y, max_x, max_y) = support::ring_bbox(&ring);

        let zones = support::require(ctx, "census_data")?
            .as_array()
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "census_data".to_string(),
                reason: "expected an array of zones".to_string(),
            })?;

        let mut total: u64 = 0;
        let mut matched = 0usize;
        for zone in zones {
            let centroid = zone.get("centroid").and_then(Value::as_array);
            let (x, y) = match centroid {
                Some(pair) => {
                    let x = pair.get(0).and_then(Value::as_f64);
                    let y = pair.get(1).and_then(Value::as_f64);
                    match (x, y) {
                        (Some(x), Some(y)) => (x, y),
                        _ => continue,
                    }
                }
                None => continue,
            };

            if x < min_x || x > max_x || y < min_y || y > max_y {
                continue;
            }
            matched += 1;
            total += zone.get("population").and_then(Value::as_u64).unwrap_or(0);
        }

        tracing::debug!(zones = zones.len(), matched, total, "census zones aggregated");
        Ok(json!(total))
    }
}

impl Calculator for CensusPopulationCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "sum_census_zones" => self.sum_census_zones(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}
