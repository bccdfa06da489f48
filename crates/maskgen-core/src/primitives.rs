//! Primitive shape factory: rectangles, regular polygons and circles.

use std::f64::consts::TAU;

use geo::{LineString, MultiPolygon, Polygon};

use crate::error::{PatternError, Result};
use crate::geometry::{Point, Shape};

/// Side count of the hexagon used for concentric-ring targets.
pub const HEXAGON_SIDES: usize = 6;

/// Build a regular `sides`-gon of circumradius `radius` centered at `center`.
///
/// The first vertex sits on the +X axis and vertices run counter-clockwise.
pub fn regular_polygon(center: Point, radius: f64, sides: usize) -> Result<Shape> {
    if !center.is_finite() {
        return Err(PatternError::InvalidGeometry(format!(
            "polygon center must be finite, got ({}, {})",
            center.x, center.y
        )));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(PatternError::InvalidGeometry(format!(
            "polygon radius must be positive, got {radius}"
        )));
    }
    if sides < 3 {
        return Err(PatternError::InvalidGeometry(format!(
            "a polygon needs at least 3 sides, got {sides}"
        )));
    }

    let step = TAU / sides as f64;
    let ring: Vec<(f64, f64)> = (0..sides)
        .map(|k| {
            let theta = k as f64 * step;
            (center.x + radius * theta.cos(), center.y + radius * theta.sin())
        })
        .collect();

    Ok(single(Polygon::new(LineString::from(ring), Vec::new())))
}

/// Number of vertices needed so that no chord strays more than `tolerance`
/// from a circle of the given radius.
pub fn circle_vertex_count(radius: f64, tolerance: f64) -> usize {
    let ratio = 1.0 - tolerance / radius;
    if ratio <= -1.0 {
        return 3;
    }
    let half_angle = ratio.acos();
    let n = 1 + (0.5 * TAU / half_angle + 0.5).floor() as usize;
    n.max(3)
}

/// Build a circle approximation whose vertex density follows `tolerance`.
pub fn circle(center: Point, radius: f64, tolerance: f64) -> Result<Shape> {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err(PatternError::InvalidGeometry(format!(
            "circle tolerance must be positive, got {tolerance}"
        )));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(PatternError::InvalidGeometry(format!(
            "circle radius must be positive, got {radius}"
        )));
    }
    regular_polygon(center, radius, circle_vertex_count(radius, tolerance))
}

/// Build the rectangle spanning `top_left` to `top_left + extent`.
///
/// Either extent component may be negative; the corner order is normalized.
pub fn rectangle(top_left: Point, extent: Point) -> Result<Shape> {
    if !top_left.is_finite() || !extent.is_finite() {
        return Err(PatternError::InvalidGeometry(
            "rectangle corners must be finite".into(),
        ));
    }
    if extent.x == 0.0 || extent.y == 0.0 {
        return Err(PatternError::InvalidGeometry(format!(
            "rectangle extent must be non-zero, got ({}, {})",
            extent.x, extent.y
        )));
    }

    let far = top_left.translate(extent.x, extent.y);
    let (x1, x2) = (top_left.x.min(far.x), top_left.x.max(far.x));
    let (y1, y2) = (top_left.y.min(far.y), top_left.y.max(far.y));
    let ring = LineString::from(vec![(x1, y1), (x2, y1), (x2, y2), (x1, y2)]);

    Ok(single(Polygon::new(ring, Vec::new())))
}

fn single(polygon: Polygon<f64>) -> Shape {
    Shape::from_region(MultiPolygon::new(vec![polygon]))
}
