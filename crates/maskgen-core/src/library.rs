use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{PatternError, Result};
use crate::geometry::{BBox, Shape};
use crate::pattern::{Layer, Pattern, PatternId, PatternRef, Transform};

/// Instances nested deeper than this are assumed to be a malformed hierarchy.
const MAX_DEPTH: usize = 64;

/// A layer-tagged shape in the coordinates of the pattern being flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatShape {
    pub layer: Layer,
    pub shape: Shape,
}

/// The top-level container owning every pattern by name.
///
/// Patterns are registered finished and in dependency order: a pattern may
/// only instance patterns that are already registered, which keeps the
/// hierarchy acyclic and makes registration order a valid write order.
#[derive(Debug, Serialize)]
pub struct Library {
    /// Library name written to the GDS header.
    pub name: String,
    patterns: Vec<Pattern>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    by_id: HashMap<PatternId, usize>,
}

impl Library {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            patterns: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a finished pattern and return its handle.
    pub fn add(&mut self, pattern: Pattern) -> Result<PatternRef> {
        if self.by_name.contains_key(&pattern.name) {
            return Err(PatternError::DuplicateName(pattern.name));
        }
        if let Some(&idx) = self.by_id.get(&pattern.id) {
            return Err(PatternError::InvalidParameter(format!(
                "pattern '{}' reuses the id of '{}'",
                pattern.name, self.patterns[idx].name
            )));
        }
        for inst in pattern.instances() {
            match self.by_id.get(&inst.pattern.id) {
                Some(&idx) if self.patterns[idx].name == inst.pattern.name => {}
                _ => return Err(PatternError::UnknownPattern(inst.pattern.name.clone())),
            }
        }

        let handle = pattern.reference();
        log::info!(
            "library '{}': registered '{}' ({} shapes, {} instances)",
            self.name,
            pattern.name,
            pattern.shape_count(),
            pattern.instance_count()
        );
        let idx = self.patterns.len();
        self.by_name.insert(pattern.name.clone(), idx);
        self.by_id.insert(pattern.id, idx);
        self.patterns.push(pattern);
        Ok(handle)
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn get(&self, id: &PatternId) -> Option<&Pattern> {
        self.by_id.get(id).map(|&idx| &self.patterns[idx])
    }

    pub fn find(&self, name: &str) -> Option<&Pattern> {
        self.by_name.get(name).map(|&idx| &self.patterns[idx])
    }

    /// Handle for instancing the named pattern.
    pub fn reference(&self, name: &str) -> Result<PatternRef> {
        self.find(name)
            .map(Pattern::reference)
            .ok_or_else(|| PatternError::UnknownPattern(name.to_string()))
    }

    /// Patterns in registration order; every pattern follows the patterns
    /// it instances.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn pattern_names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Patterns that no other pattern instances.
    pub fn top_level(&self) -> Vec<&Pattern> {
        let referenced: HashSet<PatternId> = self
            .patterns
            .iter()
            .flat_map(|p| p.instances().iter().map(|i| i.pattern.id))
            .collect();
        self.patterns
            .iter()
            .filter(|p| !referenced.contains(&p.id))
            .collect()
    }

    // ── Hierarchy resolution ─────────────────────────────────────────

    /// Resolve every instance below the named pattern into plain shapes.
    pub fn flatten(&self, name: &str) -> Result<Vec<FlatShape>> {
        let pattern = self
            .find(name)
            .ok_or_else(|| PatternError::UnknownPattern(name.to_string()))?;
        let mut out = Vec::new();
        self.flatten_into(pattern, &Transform::default(), 0, &mut out)?;
        Ok(out)
    }

    /// World bounding box of the flattened pattern.
    pub fn bbox(&self, name: &str) -> Result<Option<BBox>> {
        Ok(self
            .flatten(name)?
            .iter()
            .filter_map(|f| f.shape.bbox())
            .reduce(|a, b| a.union(&b)))
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Human-readable dump of the hierarchy, mostly for debugging.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn flatten_into(
        &self,
        pattern: &Pattern,
        transform: &Transform,
        depth: usize,
        out: &mut Vec<FlatShape>,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(PatternError::InvalidParameter(format!(
                "hierarchy below '{}' is deeper than {MAX_DEPTH}",
                pattern.name
            )));
        }
        for drawn in pattern.shapes() {
            let shape = if transform.is_identity() {
                drawn.shape.clone()
            } else {
                drawn.shape.transformed(transform)
            };
            out.push(FlatShape {
                layer: drawn.layer,
                shape,
            });
        }
        for inst in pattern.instances() {
            let child = self
                .get(&inst.pattern.id)
                .ok_or_else(|| PatternError::UnknownPattern(inst.pattern.name.clone()))?;
            let nested = transform.compose(&inst.transform);
            self.flatten_into(child, &nested, depth + 1, out)?;
        }
        Ok(())
    }
}
