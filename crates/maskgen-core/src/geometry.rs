use geo::{Area, BoundingRect, Contains, Coord, MapCoords, MultiPolygon, Translate};
use serde::{Deserialize, Serialize};

use crate::pattern::Transform;

/// A 2D point in layout coordinates (micrometers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: self.min.translate(-margin, -margin),
            max: self.max.translate(margin, margin),
        }
    }
}

/// An immutable polygonal region: zero or more polygons, each an exterior
/// loop with optional holes.
///
/// Shapes are values. Combining two shapes always produces a new shape and
/// never touches the operands, so a shape installed into a pattern cannot be
/// changed afterwards by whoever built it.
#[derive(Debug, Clone, Serialize)]
pub struct Shape {
    region: MultiPolygon<f64>,
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.region == other.region
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::empty()
    }
}

impl Shape {
    /// The empty region; the identity element of XOR composition.
    pub fn empty() -> Self {
        Self {
            region: MultiPolygon::new(Vec::new()),
        }
    }

    pub(crate) fn from_region(region: MultiPolygon<f64>) -> Self {
        Self { region }
    }

    /// Borrow the underlying `geo` multipolygon.
    pub fn region(&self) -> &MultiPolygon<f64> {
        &self.region
    }

    pub fn is_empty(&self) -> bool {
        self.region.0.is_empty()
    }

    /// Covered area, holes excluded.
    pub fn area(&self) -> f64 {
        self.region.unsigned_area()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.region
            .bounding_rect()
            .map(|r| BBox::new(r.min().into(), r.max().into()))
    }

    /// Number of disjoint polygons.
    pub fn polygon_count(&self) -> usize {
        self.region.0.len()
    }

    /// Number of boundary loops, exteriors and holes together.
    pub fn loop_count(&self) -> usize {
        self.region
            .iter()
            .map(|poly| 1 + poly.interiors().len())
            .sum()
    }

    /// Whether `p` lies strictly inside the covered region.
    pub fn contains(&self, p: &Point) -> bool {
        self.region.contains(&geo::Point::new(p.x, p.y))
    }

    /// All boundary loops as open vertex lists (closing vertex dropped),
    /// each polygon's exterior followed by its holes.
    pub fn loops(&self) -> Vec<Vec<Point>> {
        let mut loops = Vec::with_capacity(self.loop_count());
        for poly in self.region.iter() {
            for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
                let mut pts: Vec<Point> = ring.coords().map(|c| Point::from(*c)).collect();
                if pts.len() > 1 && pts.first() == pts.last() {
                    pts.pop();
                }
                loops.push(pts);
            }
        }
        loops
    }

    pub fn is_finite(&self) -> bool {
        self.region
            .iter()
            .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors()))
            .flat_map(|ring| ring.coords())
            .all(|c| c.x.is_finite() && c.y.is_finite())
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            region: self.region.translate(dx, dy),
        }
    }

    /// Apply an instance transform (scale, then rotate, then translate).
    pub fn transformed(&self, transform: &Transform) -> Self {
        let region = self.region.map_coords(|c| {
            let p = transform.apply(&Point::from(c));
            Coord { x: p.x, y: p.y }
        });
        Self { region }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::rectangle;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_union_and_expand() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, -5.0), Point::new(15.0, 5.0));
        let u = a.union(&b).expand(1.0);
        assert_eq!(u.min, Point::new(-1.0, -6.0));
        assert_eq!(u.max, Point::new(16.0, 11.0));
        assert!((u.width() - 17.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_shape() {
        let s = Shape::empty();
        assert!(s.is_empty());
        assert_eq!(s.loop_count(), 0);
        assert!(s.bbox().is_none());
        assert_eq!(s.area(), 0.0);
    }

    #[test]
    fn test_shape_loops_drop_closing_vertex() {
        let r = rectangle(Point::new(0.0, 0.0), Point::new(2.0, 1.0)).unwrap();
        let loops = r.loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert!((r.area() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_shape_translate_is_a_copy() {
        let r = rectangle(Point::new(0.0, 0.0), Point::new(2.0, 1.0)).unwrap();
        let moved = r.translate(10.0, 0.0);
        assert!(r.contains(&Point::new(1.0, 0.5)));
        assert!(!moved.contains(&Point::new(1.0, 0.5)));
        assert!(moved.contains(&Point::new(11.0, 0.5)));
    }

    #[test]
    fn test_shape_transformed() {
        let r = rectangle(Point::new(0.0, 0.0), Point::new(2.0, 1.0)).unwrap();
        let t = Transform::new(Point::new(5.0, 0.0), 90.0, 2.0);
        let bb = r.transformed(&t).bbox().unwrap();
        assert!((bb.min.x - 3.0).abs() < 1e-9);
        assert!((bb.max.x - 5.0).abs() < 1e-9);
        assert!((bb.min.y - 0.0).abs() < 1e-9);
        assert!((bb.max.y - 4.0).abs() < 1e-9);
    }
}
