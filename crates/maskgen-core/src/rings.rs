//! Concentric-ring ("target") accumulation and ring arrays.
//!
//! Rings come from XOR-folding regular polygons of growing radius into an
//! initially empty shape, so neighbouring bands alternate between filled and
//! empty. With `ring_count` even the innermost polygon is filled.

use serde::{Deserialize, Serialize};

use crate::boolean::xor;
use crate::error::{grid_size, require_count, require_finite, PatternError, Result};
use crate::geometry::{Point, Shape};
use crate::pattern::Pattern;
use crate::primitives::{regular_polygon, HEXAGON_SIDES};

/// Parameters of one ring stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    /// Number of rings beyond the first; `ring_count + 1` polygons are folded.
    pub ring_count: usize,
    /// Circumradius of the innermost polygon.
    pub start_radius: f64,
    /// Radial distance between consecutive polygons.
    pub pitch: f64,
    /// Polygon side count.
    pub sides: usize,
}

impl RingSpec {
    /// Hexagonal rings, the shape used for trench targets.
    pub fn hexagonal(ring_count: usize, start_radius: f64, pitch: f64) -> Self {
        Self {
            ring_count,
            start_radius,
            pitch,
            sides: HEXAGON_SIDES,
        }
    }

    pub fn with_pitch(self, pitch: f64) -> Self {
        Self { pitch, ..self }
    }

    pub fn outer_radius(&self) -> f64 {
        self.start_radius + self.ring_count as f64 * self.pitch
    }

    fn validate(&self) -> Result<()> {
        if !(self.start_radius.is_finite() && self.start_radius > 0.0) {
            return Err(PatternError::InvalidGeometry(format!(
                "ring start radius must be positive, got {}",
                self.start_radius
            )));
        }
        require_finite("ring pitch", &[self.pitch])?;
        if self.ring_count > 0 && self.pitch <= 0.0 {
            return Err(PatternError::InvalidParameter(format!(
                "ring pitch must be positive for {} rings, got {}",
                self.ring_count, self.pitch
            )));
        }
        if self.sides < 3 {
            return Err(PatternError::InvalidGeometry(format!(
                "ring polygons need at least 3 sides, got {}",
                self.sides
            )));
        }
        Ok(())
    }
}

/// Hexagonal concentric rings around `center`.
pub fn build_concentric_rings(
    center: Point,
    ring_count: usize,
    start_radius: f64,
    pitch: f64,
) -> Result<Shape> {
    build_ring_stack(center, &RingSpec::hexagonal(ring_count, start_radius, pitch))
}

/// Fold `spec.ring_count + 1` polygons at radius `start_radius + k * pitch`.
pub fn build_ring_stack(center: Point, spec: &RingSpec) -> Result<Shape> {
    spec.validate()?;

    let mut acc = Shape::empty();
    for k in 0..=spec.ring_count {
        let radius = spec.start_radius + k as f64 * spec.pitch;
        let polygon = regular_polygon(center, radius, spec.sides)?;
        acc = xor(&acc, &polygon)?;
    }

    log::debug!(
        "ring stack at ({}, {}): {} polygons, radius {}..{}",
        center.x,
        center.y,
        spec.ring_count + 1,
        spec.start_radius,
        spec.outer_radius()
    );
    Ok(acc)
}

/// Place `count` independent ring stacks, each `step` further along and
/// each with a ring pitch `pitch_increment` wider than the last.
pub fn tile_rings_horizontal(
    target: &mut Pattern,
    center: Point,
    rings: &RingSpec,
    pitch_increment: f64,
    step: Point,
    count: usize,
) -> Result<()> {
    let stacks = ring_row(center, rings, pitch_increment, step, count)?;
    for shape in stacks {
        target.add_shape(shape);
    }
    Ok(())
}

/// Rows of ring stacks. Within a row stacks advance by `pitch_x` with
/// growing ring pitch; each new row starts `pitch_y` further along Y and
/// restarts at the initial ring pitch.
#[allow(clippy::too_many_arguments)]
pub fn tile_rings_grid(
    target: &mut Pattern,
    center: Point,
    rings: &RingSpec,
    pitch_increment: f64,
    pitch_x: f64,
    pitch_y: f64,
    count_x: usize,
    count_y: usize,
) -> Result<()> {
    require_count("ring grid rows", count_y)?;
    require_finite("ring grid pitch", &[pitch_y])?;

    let total = grid_size("ring grid", count_x, count_y)?;

    let mut stacks = Vec::with_capacity(total);
    for row in 0..count_y {
        let row_center = center.translate(0.0, row as f64 * pitch_y);
        stacks.extend(ring_row(
            row_center,
            rings,
            pitch_increment,
            Point::new(pitch_x, 0.0),
            count_x,
        )?);
    }
    for shape in stacks {
        target.add_shape(shape);
    }
    Ok(())
}

fn ring_row(
    center: Point,
    rings: &RingSpec,
    pitch_increment: f64,
    step: Point,
    count: usize,
) -> Result<Vec<Shape>> {
    require_count("ring stack count", count)?;
    require_finite("ring array step", &[pitch_increment, step.x, step.y])?;

    let widest = rings.pitch + (count - 1) as f64 * pitch_increment;
    rings.with_pitch(rings.pitch.min(widest)).validate()?;

    (0..count)
        .map(|i| {
            let at = center.translate(i as f64 * step.x, i as f64 * step.y);
            let spec = rings.with_pitch(rings.pitch + i as f64 * pitch_increment);
            build_ring_stack(at, &spec)
        })
        .collect()
}
