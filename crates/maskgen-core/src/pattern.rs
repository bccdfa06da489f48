use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Point, Shape};

/// Unique pattern identifier.
pub type PatternId = Uuid;

/// GDS layer/datatype pair a shape is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Layer {
    pub layer: u16,
    pub datatype: u16,
}

impl Layer {
    pub fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }
}

/// Placement of an instance: scale, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation offset.
    pub origin: Point,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f64,
    /// Uniform magnification.
    pub magnification: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            origin: Point::new(0.0, 0.0),
            rotation: 0.0,
            magnification: 1.0,
        }
    }
}

impl Transform {
    pub fn new(origin: Point, rotation: f64, magnification: f64) -> Self {
        Self {
            origin,
            rotation,
            magnification,
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn is_identity(&self) -> bool {
        self.origin == Point::new(0.0, 0.0) && self.rotation == 0.0 && self.magnification == 1.0
    }

    pub fn apply(&self, point: &Point) -> Point {
        let x = point.x * self.magnification;
        let y = point.y * self.magnification;

        let (sin_r, cos_r) = self.rotation.to_radians().sin_cos();
        let rx = x * cos_r - y * sin_r;
        let ry = x * sin_r + y * cos_r;

        Point::new(rx + self.origin.x, ry + self.origin.y)
    }

    /// The transform equivalent to applying `inner` first and then `self`.
    pub fn compose(&self, inner: &Transform) -> Transform {
        Transform {
            origin: self.apply(&inner.origin),
            rotation: self.rotation + inner.rotation,
            magnification: self.magnification * inner.magnification,
        }
    }
}

/// A handle on a registered pattern, enough to instance it elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRef {
    pub id: PatternId,
    pub name: String,
}

/// A placement of one pattern inside another. Geometry is never copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub pattern: PatternRef,
    pub transform: Transform,
}

impl Instance {
    pub fn new(pattern: PatternRef, transform: Transform) -> Self {
        Self { pattern, transform }
    }
}

/// A shape drawn on a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drawn {
    pub layer: Layer,
    pub shape: Shape,
}

/// A named cell: its own shapes plus instances of other patterns.
///
/// Builders only ever append, so a pattern may already hold unrelated
/// geometry when it is handed to one.
#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    /// Layer newly added shapes are drawn on.
    pub layer: Layer,
    shapes: Vec<Drawn>,
    instances: Vec<Instance>,
}

impl Pattern {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            layer: Layer::default(),
            shapes: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Handle used by other patterns to instance this one.
    pub fn reference(&self) -> PatternRef {
        PatternRef {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Append a shape on the pattern's current layer. Empty shapes are skipped.
    pub fn add_shape(&mut self, shape: Shape) {
        let layer = self.layer;
        self.add_shape_on(layer, shape);
    }

    pub fn add_shape_on(&mut self, layer: Layer, shape: Shape) {
        if shape.is_empty() {
            log::warn!("skipping empty shape in pattern '{}'", self.name);
            return;
        }
        self.shapes.push(Drawn { layer, shape });
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn shapes(&self) -> &[Drawn] {
        &self.shapes
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Shapes plus instances.
    pub fn element_count(&self) -> usize {
        self.shapes.len() + self.instances.len()
    }

    /// Bounding box of this pattern's own shapes (instances not included).
    pub fn local_bbox(&self) -> Option<BBox> {
        self.shapes
            .iter()
            .filter_map(|d| d.shape.bbox())
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::rectangle;

    #[test]
    fn test_pattern_add_shape() {
        let mut p = Pattern::new("bars");
        p.add_shape(rectangle(Point::new(0.0, 0.0), Point::new(15.0, 0.05)).unwrap());
        p.add_shape(Shape::empty());
        assert_eq!(p.shape_count(), 1);
        assert_eq!(p.shapes()[0].layer, Layer::default());
    }

    #[test]
    fn test_pattern_layer() {
        let mut p = Pattern::new("dots").with_layer(Layer::new(2, 1));
        p.add_shape(rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0)).unwrap());
        assert_eq!(p.shapes()[0].layer, Layer::new(2, 1));
    }

    #[test]
    fn test_pattern_bbox() {
        let mut p = Pattern::new("cell");
        p.add_shape(rectangle(Point::new(0.0, 0.0), Point::new(100.0, 50.0)).unwrap());
        p.add_shape(rectangle(Point::new(50.0, 25.0), Point::new(150.0, 50.0)).unwrap());
        let bb = p.local_bbox().unwrap();
        assert!((bb.min.x - 0.0).abs() < 1e-10);
        assert!((bb.max.x - 200.0).abs() < 1e-10);
        assert!((bb.max.y - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_order() {
        // scale, then rotate, then translate
        let t = Transform::new(Point::new(10.0, 20.0), 90.0, 2.0);
        let p = t.apply(&Point::new(1.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-10);
        assert!((p.y - 22.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_compose() {
        let outer = Transform::new(Point::new(5.0, 0.0), 90.0, 2.0);
        let inner = Transform::new(Point::new(1.0, 1.0), 45.0, 0.5);
        let composed = outer.compose(&inner);
        let q = Point::new(3.0, -2.0);
        let a = outer.apply(&inner.apply(&q));
        let b = composed.apply(&q);
        assert!((a.x - b.x).abs() < 1e-10);
        assert!((a.y - b.y).abs() < 1e-10);
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let result = t.apply(&Point::new(5.0, 5.0));
        assert!((result.x - 15.0).abs() < 1e-10);
        assert!((result.y - 25.0).abs() < 1e-10);
        assert!(Transform::default().is_identity());
    }
}
