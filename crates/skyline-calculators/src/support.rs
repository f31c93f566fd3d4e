//! Shared input-reading helpers for the built-in calculators.
use serde_json::Value;
use skyline_core::{CalculationError, Context};

pub(crate) fn require<'a>(ctx: &'a Context, key: &str) -> Result<&'a Value, CalculationError> {
    ctx.get(key)
        .ok_or_else(|| CalculationError::MissingInput(key.to_string()))
}

pub(crate) fn require_f64(ctx: &Context, key: &str) -> Result<f64, CalculationError> {
    require(ctx, key)?
        .as_f64()
        .ok_or_else(|| CalculationError::InvalidInput {
            name: key.to_string(),
            reason: "expected a number".to_string(),
        })
}

pub(crate) fn number_array(value: &Value, name: &str) -> Result<Vec<f64>, CalculationError> {
    let items = value
        .as_array()
        .ok_or_else(|| CalculationError::InvalidInput {
            name: name.to_string(),
            reason: "expected an array of numbers".to_string(),
        })?;
    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| CalculationError::InvalidInput {
                name: name.to_string(),
                reason: "expected an array of numbers".to_string(),
            })
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Outer ring of a polygon geometry, in projected meters.
///
/// Accepts both a bare geometry (`{"type", "coordinates"}`) and a wrapped
/// one (`{"geometry": {...}}`), matching the two shapes callers send.
pub(crate) fn footprint_ring(
    value: &Value,
    name: &str,
) -> Result<Vec<(f64, f64)>, CalculationError> {
    let geometry = match value.get("geometry") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };

    let invalid = |reason: &str| CalculationError::InvalidInput {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let coordinates = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("geometry has no coordinates"))?;
    let ring = coordinates
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("geometry has no outer ring"))?;

    let mut points = Vec::with_capacity(ring.len());
    for pair in ring {
        let x = pair.get(0).and_then(Value::as_f64);
        let y = pair.get(1).and_then(Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) => points.push((x, y)),
            _ => return Err(invalid("ring contains a malformed coordinate pair")),
        }
    }

    if points.len() < 3 {
        return Err(invalid("outer ring needs at least 3 points"));
    }
    Ok(points)
}

/// Shoelace area of a closed or open ring, in square meters.
pub(crate) fn ring_area(ring: &[(f64, f64)]) -> f64 {
    let mut doubled = 0.0;
    for i in 0..ring.len() {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % ring.len()];
        doubled += x1 * y2 - x2 * y1;
    }
    (doubled / 2.0).abs()
}

/// Axis-aligned bounding box of a ring as (min_x, min_y, max_x, max_y).
pub(crate) fn ring_bbox(ring: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(x, y) in ring {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
