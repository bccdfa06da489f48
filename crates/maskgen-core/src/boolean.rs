//! Symmetric-difference composition of shapes.
//!
//! Clipping is delegated to `geo`'s `BooleanOps`. Everything this module
//! hands back is a clean multipolygon, so only caller-supplied loops
//! (`shape_from_loops`) need a simplicity check.

use geo::algorithm::line_intersection::line_intersection;
use geo::{BooleanOps, Line, LineString, MultiPolygon, Polygon};

use crate::error::{PatternError, Result};
use crate::geometry::{Point, Shape};

/// XOR two shapes: area covered by exactly one operand survives.
///
/// An empty or zero-area operand returns the other operand unchanged.
pub fn xor(a: &Shape, b: &Shape) -> Result<Shape> {
    if !a.is_finite() || !b.is_finite() {
        return Err(PatternError::GeometryOpFailed(
            "xor operand has non-finite coordinates".into(),
        ));
    }
    if a.is_empty() || a.area() == 0.0 {
        return Ok(b.clone());
    }
    if b.is_empty() || b.area() == 0.0 {
        return Ok(a.clone());
    }

    let region = a.region().xor(b.region());
    let result = Shape::from_region(region);
    if !result.is_finite() {
        return Err(PatternError::GeometryOpFailed(
            "xor produced non-finite coordinates".into(),
        ));
    }
    if result.is_empty() {
        log::warn!("xor of two non-empty shapes cancelled out completely");
    }
    Ok(result)
}

/// Fold `xor` over `shapes`, starting from the empty shape.
pub fn xor_all<I>(shapes: I) -> Result<Shape>
where
    I: IntoIterator<Item = Shape>,
{
    shapes
        .into_iter()
        .try_fold(Shape::empty(), |acc, s| xor(&acc, &s))
}

/// Build a shape from raw closed loops, combined even-odd.
///
/// Each loop must have at least three vertices, finite coordinates and no
/// self-intersections; a loop that fails is reported as `GeometryOpFailed`.
pub fn shape_from_loops(loops: Vec<Vec<Point>>) -> Result<Shape> {
    let mut acc = Shape::empty();
    for (index, ring) in loops.into_iter().enumerate() {
        if ring.len() < 3 {
            return Err(PatternError::GeometryOpFailed(format!(
                "loop {index} has {} vertices, need at least 3",
                ring.len()
            )));
        }
        if !ring.iter().all(Point::is_finite) {
            return Err(PatternError::GeometryOpFailed(format!(
                "loop {index} has non-finite coordinates"
            )));
        }
        if !is_simple(&ring) {
            return Err(PatternError::GeometryOpFailed(format!(
                "loop {index} is self-intersecting"
            )));
        }
        let line = LineString::from(ring.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>());
        let piece = Shape::from_region(MultiPolygon::new(vec![Polygon::new(line, Vec::new())]));
        acc = xor(&acc, &piece)?;
    }
    Ok(acc)
}

/// Whether the closed loop has no crossing or touching non-adjacent edges.
fn is_simple(ring: &[Point]) -> bool {
    let n = ring.len();
    let edge = |i: usize| Line::new(ring[i], ring[(i + 1) % n]);
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            if line_intersection(edge(i), edge(j)).is_some() {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{rectangle, regular_polygon};

    fn square(x: f64, y: f64, size: f64) -> Shape {
        rectangle(Point::new(x, y), Point::new(size, size)).unwrap()
    }

    #[test]
    fn test_xor_identity() {
        let s = square(0.0, 0.0, 1.0);
        assert_eq!(xor(&Shape::empty(), &s).unwrap(), s);
        assert_eq!(xor(&s, &Shape::empty()).unwrap(), s);
    }

    #[test]
    fn test_xor_overlap_cancels() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 1.0, 2.0);
        let c = xor(&a, &b).unwrap();
        // 4 + 4 - 2 * 1
        assert!((c.area() - 6.0).abs() < 1e-9);
        assert!(!c.contains(&Point::new(1.5, 1.5)));
        assert!(c.contains(&Point::new(0.5, 0.5)));
        assert!(c.contains(&Point::new(2.5, 2.5)));
    }

    #[test]
    fn test_xor_self_is_empty() {
        let a = square(0.0, 0.0, 2.0);
        let c = xor(&a, &a).unwrap();
        assert!(c.area() < 1e-9);
    }

    #[test]
    fn test_xor_associative() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 0.5, 2.0);
        let c = regular_polygon(Point::new(1.5, 1.5), 1.2, 6).unwrap();

        let left = xor(&xor(&a, &b).unwrap(), &c).unwrap();
        let right = xor(&a, &xor(&b, &c).unwrap()).unwrap();
        assert!((left.area() - right.area()).abs() < 1e-9);
        let diff = xor(&left, &right).unwrap();
        assert!(diff.area() < 1e-9);
    }

    #[test]
    fn test_xor_all_order_independent() {
        let shapes = vec![
            square(0.0, 0.0, 3.0),
            square(1.0, 1.0, 1.0),
            square(2.0, 2.0, 2.0),
        ];
        let forward = xor_all(shapes.clone()).unwrap();
        let backward = xor_all(shapes.into_iter().rev()).unwrap();
        assert!(xor(&forward, &backward).unwrap().area() < 1e-9);
    }

    #[test]
    fn test_xor_rejects_non_finite() {
        let a = square(0.0, 0.0, 1.0);
        let bad = a.translate(f64::NAN, 0.0);
        assert!(matches!(
            xor(&a, &bad),
            Err(PatternError::GeometryOpFailed(_))
        ));
    }

    #[test]
    fn test_loops_nested_make_hole() {
        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let inner = vec![
            Point::new(1.0, 1.0),
            Point::new(3.0, 1.0),
            Point::new(3.0, 3.0),
            Point::new(1.0, 3.0),
        ];
        let s = shape_from_loops(vec![outer, inner]).unwrap();
        assert_eq!(s.loop_count(), 2);
        assert!((s.area() - 12.0).abs() < 1e-9);
        assert!(!s.contains(&Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_loops_reject_bowtie() {
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(matches!(
            shape_from_loops(vec![bowtie]),
            Err(PatternError::GeometryOpFailed(_))
        ));
    }
}
