//! Building feature calculators.
//!
//! Each calculator reads its inputs from the run context and returns a JSON
//! value for the engine to store. Heuristic constants follow common Italian
//! building-stock assumptions; callers with better data seed the context and
//! the higher-priority methods pick it up.
use serde_json::json;
use skyline_core::{CalcResult, CalculationError, Calculator, Context};

use crate::support;

/// Assumed storey height when converting between floors and height.
const FLOOR_HEIGHT_M: f64 = 3.2;
/// Last-resort building height when no raster or props data exists.
const DEFAULT_HEIGHT_M: f64 = 12.0;
/// Gross floor area one resident occupies on average.
const AREA_PER_RESIDENT_M2: f64 = 35.0;
/// Average household size used to derive family counts.
const HOUSEHOLD_SIZE: f64 = 2.4;

#[derive(Default)]
pub struct AreaCalculator;

impl AreaCalculator {
    fn calculate_from_footprint(&self, ctx: &Context) -> CalcResult {
        let geo = support::require(ctx, "building_geo")?;
        let ring = support::footprint_ring(geo, "building_geo")?;
        let area = support::ring_area(&ring);
        if area <= 0.0 {
            return Err(CalculationError::InvalidInput {
                name: "building_geo".to_string(),
                reason: "degenerate footprint".to_string(),
            });
        }
        Ok(json!(support::round2(area)))
    }
}

impl Calculator for AreaCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "calculate_from_footprint" => self.calculate_from_footprint(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct HeightCalculator;

impl HeightCalculator {
    /// Surface minus terrain over the footprint's raster samples.
    fn calculate_from_raster(&self, ctx: &Context) -> CalcResult {
        let dsm = support::number_array(support::require(ctx, "dsm_sample")?, "dsm_sample")?;
        let dtm = support::number_array(support::require(ctx, "dtm_sample")?, "dtm_sample")?;

        let surface = support::mean(&dsm).ok_or_else(|| CalculationError::InvalidInput {
            name: "dsm_sample".to_string(),
            reason: "empty sample".to_string(),
        })?;
        let terrain = support::mean(&dtm).ok_or_else(|| CalculationError::InvalidInput {
            name: "dtm_sample".to_string(),
            reason: "empty sample".to_string(),
        })?;

        let height = surface - terrain;
        if height <= 0.0 {
            return Err(CalculationError::InvalidInput {
                name: "dsm_sample".to_string(),
                reason: format!("surface below terrain ({height:.2} m)"),
            });
        }
        Ok(json!(support::round2(height)))
    }

    fn estimate_from_floors(&self, ctx: &Context) -> CalcResult {
        let props = support::require(ctx, "building_props")?;
        let floors = props
            .get("n_floors")
            .and_then(|v| v.as_u64())
            .filter(|n| *n > 0)
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "building_props".to_string(),
                reason: "no positive n_floors".to_string(),
            })?;
        Ok(json!(support::round2(floors as f64 * FLOOR_HEIGHT_M)))
    }

    fn default_height(&self) -> CalcResult {
        tracing::debug!("falling back to default building height");
        Ok(json!(DEFAULT_HEIGHT_M))
    }
}

impl Calculator for HeightCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "calculate_from_raster" => self.calculate_from_raster(ctx),
            "estimate_from_floors" => self.estimate_from_floors(ctx),
            "default_height" => self.default_height(),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct FloorsCalculator;

impl FloorsCalculator {
    fn read_from_props(&self, ctx: &Context) -> CalcResult {
        let props = support::require(ctx, "building_props")?;
        let floors = props
            .get("n_floors")
            .and_then(|v| v.as_u64())
            .filter(|n| *n > 0)
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "building_props".to_string(),
                reason: "no positive n_floors".to_string(),
            })?;
        Ok(json!(floors))
    }

    fn estimate_from_height(&self, ctx: &Context) -> CalcResult {
        let height = support::require_f64(ctx, "building_height")?;
        let floors = (height / FLOOR_HEIGHT_M).floor().max(1.0) as u64;
        Ok(json!(floors))
    }
}

impl Calculator for FloorsCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "read_from_props" => self.read_from_props(ctx),
            "estimate_from_height" => self.estimate_from_height(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct VolumeCalculator;

impl VolumeCalculator {
    fn calculate_from_area_height(&self, ctx: &Context) -> CalcResult {
        let area = support::require_f64(ctx, "building_area")?;
        let height = support::require_f64(ctx, "building_height")?;
        Ok(json!(support::round2(area * height)))
    }
}

impl Calculator for VolumeCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "calculate_from_area_height" => self.calculate_from_area_height(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct TypeCalculator;

impl TypeCalculator {
    fn read_from_props(&self, ctx: &Context) -> CalcResult {
        let props = support::require(ctx, "building_props")?;
        let kind = props
            .get("building_type")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "building_props".to_string(),
                reason: "no building_type".to_string(),
            })?;
        Ok(json!(kind))
    }

    fn default_type(&self) -> CalcResult {
        Ok(json!("residential"))
    }
}

impl Calculator for TypeCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "read_from_props" => self.read_from_props(ctx),
            "default_type" => self.default_type(),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct PopulationCalculator;

impl PopulationCalculator {
    /// Gross floor area divided by per-resident occupancy. Non-residential
    /// buildings house nobody.
    fn estimate_from_floor_area(&self, ctx: &Context) -> CalcResult {
        let kind = support::require(ctx, "building_type")?
            .as_str()
            .unwrap_or("")
            .to_string();
        if kind != "residential" {
            return Ok(json!(0));
        }

        let area = support::require_f64(ctx, "building_area")?;
        let floors = support::require(ctx, "building_n_floors")?
            .as_u64()
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "building_n_floors".to_string(),
                reason: "expected a positive integer".to_string(),
            })?;

        let gross_area = area * floors as f64;
        let residents = (gross_area / AREA_PER_RESIDENT_M2).round() as u64;
        Ok(json!(residents))
    }
}

impl Calculator for PopulationCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "estimate_from_floor_area" => self.estimate_from_floor_area(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Default)]
pub struct FamiliesCalculator;

impl FamiliesCalculator {
    fn estimate_from_population(&self, ctx: &Context) -> CalcResult {
        let population = support::require(ctx, "building_population")?
            .as_u64()
            .ok_or_else(|| CalculationError::InvalidInput {
                name: "building_population".to_string(),
                reason: "expected a non-negative integer".to_string(),
            })?;
        if population == 0 {
            return Ok(json!(0));
        }
        let families = ((population as f64 / HOUSEHOLD_SIZE).round() as u64).max(1);
        Ok(json!(families))
    }
}

impl Calculator for FamiliesCalculator {
    fn invoke(&self, method: &str, ctx: &Context) -> CalcResult {
        match method {
            "estimate_from_population" => self.estimate_from_population(ctx),
            other => Err(CalculationError::UnknownMethod(other.to_string())),
        }
    }
}
