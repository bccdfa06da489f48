//! Dot fields XOR-ed onto a substrate shape.
//!
//! Dot spacing is edge to edge: consecutive centers are `2 * radius + pitch`
//! apart. Later fields cancel earlier geometry wherever they overlap.

use serde::{Deserialize, Serialize};

use crate::boolean::xor;
use crate::error::{require_count, require_finite, Result};
use crate::geometry::{Point, Shape};
use crate::primitives::circle;

/// Size and vertex density of a single dot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub radius: f64,
    pub tolerance: f64,
}

impl Dot {
    pub fn new(radius: f64, tolerance: f64) -> Self {
        Self { radius, tolerance }
    }

    /// Center-to-center step for a given edge-to-edge `pitch`.
    pub fn step(&self, pitch: f64) -> f64 {
        2.0 * self.radius + pitch
    }
}

/// A grid of dots anchored at the first dot's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotField {
    pub origin: Point,
    pub dot: Dot,
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub count_x: usize,
    pub count_y: usize,
}

/// XOR one dot centered at `center` into `substrate`.
pub fn place_dot(substrate: &Shape, center: Point, dot: Dot) -> Result<Shape> {
    let disk = circle(center, dot.radius, dot.tolerance)?;
    xor(substrate, &disk)
}

/// XOR `count` dots left to right starting at `origin`.
pub fn fill_row_of_dots(
    substrate: &Shape,
    origin: Point,
    dot: Dot,
    pitch: f64,
    count: usize,
) -> Result<Shape> {
    require_count("dots per row", count)?;
    require_finite("dot pitch", &[pitch])?;

    let step = dot.step(pitch);
    (0..count).try_fold(substrate.clone(), |acc, k| {
        place_dot(&acc, origin.translate(k as f64 * step, 0.0), dot)
    })
}

/// XOR `count_y` rows of `count_x` dots, rows `2 * radius + pitch_y` apart.
pub fn fill_grid_of_dots(
    substrate: &Shape,
    origin: Point,
    dot: Dot,
    pitch_x: f64,
    pitch_y: f64,
    count_x: usize,
    count_y: usize,
) -> Result<Shape> {
    require_count("dot rows", count_y)?;
    require_count("dots per row", count_x)?;
    require_finite("dot pitch", &[pitch_x, pitch_y])?;

    let step = dot.step(pitch_y);
    let result = (0..count_y).try_fold(substrate.clone(), |acc, row| {
        fill_row_of_dots(&acc, origin.translate(0.0, row as f64 * step), dot, pitch_x, count_x)
    })?;
    log::debug!(
        "{}x{} dot field at ({}, {}), pitch {}/{}",
        count_x,
        count_y,
        origin.x,
        origin.y,
        pitch_x,
        pitch_y
    );
    Ok(result)
}

/// Layer each field over the previous result, in order.
pub fn layer_dot_fields(substrate: &Shape, fields: &[DotField]) -> Result<Shape> {
    fields.iter().try_fold(substrate.clone(), |acc, f| {
        fill_grid_of_dots(&acc, f.origin, f.dot, f.pitch_x, f.pitch_y, f.count_x, f.count_y)
    })
}
