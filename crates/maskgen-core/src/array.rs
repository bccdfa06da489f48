//! Rectangle arrays: single rows and row stacks of bars.

use serde::{Deserialize, Serialize};

use crate::error::{grid_size, require_count, require_finite, Result};
use crate::geometry::{Point, Shape};
use crate::pattern::Pattern;
use crate::primitives::rectangle;

/// Size of one bar: `length` along X, `width` along Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarSize {
    pub length: f64,
    pub width: f64,
}

impl BarSize {
    pub fn new(length: f64, width: f64) -> Self {
        Self { length, width }
    }
}

/// Place `count` bars left to right from `origin`, the k-th with its left
/// edge at `origin.x + k * (length + pitch)`.
pub fn tile_horizontal(
    target: &mut Pattern,
    origin: Point,
    unit: BarSize,
    pitch: f64,
    count: usize,
) -> Result<()> {
    let bars = bar_row(origin, unit, pitch, count)?;
    log::debug!(
        "pattern '{}': {} bars of {}x{} from ({}, {})",
        target.name,
        bars.len(),
        unit.length,
        unit.width,
        origin.x,
        origin.y
    );
    for bar in bars {
        target.add_shape(bar);
    }
    Ok(())
}

/// Stack `count_y` rows of `count_x` bars, row k starting at
/// `origin.y + k * (width + pitch_y)`.
#[allow(clippy::too_many_arguments)]
pub fn tile_grid(
    target: &mut Pattern,
    origin: Point,
    unit: BarSize,
    pitch_x: f64,
    pitch_y: f64,
    count_x: usize,
    count_y: usize,
) -> Result<()> {
    require_count("bar rows", count_y)?;
    require_finite("row pitch", &[pitch_y])?;

    let total = grid_size("bar grid", count_x, count_y)?;

    let row_step = unit.width + pitch_y;
    let mut bars = Vec::with_capacity(total);
    for row in 0..count_y {
        let row_origin = origin.translate(0.0, row as f64 * row_step);
        bars.extend(bar_row(row_origin, unit, pitch_x, count_x)?);
    }

    log::debug!(
        "pattern '{}': {}x{} bar grid, row step {}",
        target.name,
        count_x,
        count_y,
        row_step
    );
    for bar in bars {
        target.add_shape(bar);
    }
    Ok(())
}

fn bar_row(origin: Point, unit: BarSize, pitch: f64, count: usize) -> Result<Vec<Shape>> {
    require_count("bars per row", count)?;
    require_finite("bar pitch", &[pitch])?;

    let step = unit.length + pitch;
    let extent = Point::new(unit.length, unit.width);
    (0..count)
        .map(|k| rectangle(origin.translate(k as f64 * step, 0.0), extent))
        .collect()
}
