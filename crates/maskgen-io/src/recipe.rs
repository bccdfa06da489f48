//! Mask recipes: every numeric parameter of a layout, and the assembly of
//! that layout into a [`Library`].
//!
//! `Recipe::default()` is the PMMA test mask. A recipe file only needs the
//! fields it changes; everything else keeps its default.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use maskgen_core::array::{tile_grid, BarSize};
use maskgen_core::dots::{layer_dot_fields, Dot, DotField};
use maskgen_core::fan::{fan_horizontal, place_rotated_copy, rotation_matrix, RotationMatrix};
use maskgen_core::primitives::rectangle;
use maskgen_core::rings::{tile_rings_horizontal, RingSpec};
use maskgen_core::{Library, Pattern, PatternError, PatternRef, Point};

use crate::gds::GdsSettings;
use crate::svg::SvgOptions;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid recipe: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Recipe sections ──────────────────────────────────────────────────

/// A row of ring stacks drawn directly into one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexagonArray {
    pub cell: String,
    /// Center of the first stack.
    pub center: Point,
    pub rings: RingSpec,
    /// Ring pitch added per stack.
    pub pitch_increment: f64,
    /// Offset between stack centers.
    pub step: Point,
    pub count: usize,
}

impl Default for HexagonArray {
    fn default() -> Self {
        Self {
            cell: "hexagon".to_string(),
            center: Point::new(0.0, -60.0),
            rings: RingSpec::hexagonal(40, 0.5, 0.05),
            pitch_increment: 0.02,
            step: Point::new(40.0, 0.0),
            count: 10,
        }
    }
}

/// One bar cell and the two fan cells built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarVariant {
    pub cell: String,
    pub bar: BarSize,
    /// Gap between bars in a row.
    pub bar_pitch: f64,
    /// Gap between rows.
    pub row_pitch: f64,
    pub bars_per_row: usize,
    pub rows: usize,
    pub origin: Point,
    /// X of the first copy in every fan of this variant.
    pub fan_x: f64,
    /// Cell holding the rotation matrix.
    pub rotated_cell: String,
    /// Cell holding the extra fixed-angle fans.
    pub extra_cell: String,
}

impl Default for BarVariant {
    fn default() -> Self {
        Self::new("rectangle_0point1_dy", "rotated_rectangular_0point1_dy", 0.05, 0.05, 0.0)
    }
}

impl BarVariant {
    fn new(cell: &str, rotated_cell: &str, width: f64, row_pitch: f64, fan_x: f64) -> Self {
        Self {
            cell: cell.to_string(),
            bar: BarSize::new(15.0, width),
            bar_pitch: 0.0,
            row_pitch,
            bars_per_row: 1,
            rows: 20,
            origin: Point::new(0.0, 0.0),
            fan_x,
            rotated_cell: rotated_cell.to_string(),
            extra_cell: format!("{rotated_cell}_1"),
        }
    }
}

/// A single-angle fan at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtraFan {
    pub angle: f64,
    pub y: f64,
}

/// Rotation settings shared by every bar variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanSettings {
    pub start_angle: f64,
    pub final_angle: f64,
    pub angle_step: f64,
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub copies_per_row: usize,
    pub scale: f64,
    pub extra: Vec<ExtraFan>,
}

impl Default for FanSettings {
    fn default() -> Self {
        Self {
            start_angle: 0.0,
            final_angle: 90.0,
            angle_step: 15.0,
            pitch_x: 20.0,
            pitch_y: 20.0,
            copies_per_row: 3,
            scale: 1.0,
            extra: vec![
                ExtraFan {
                    angle: 35.27,
                    y: -20.0,
                },
                ExtraFan {
                    angle: 54.74,
                    y: -40.0,
                },
            ],
        }
    }
}

impl FanSettings {
    pub fn matrix_at(&self, origin: Point) -> RotationMatrix {
        RotationMatrix {
            origin,
            scale: self.scale,
            start_angle: self.start_angle,
            final_angle: self.final_angle,
            angle_step: self.angle_step,
            pitch_x: self.pitch_x,
            pitch_y: self.pitch_y,
            copies_per_row: self.copies_per_row,
        }
    }
}

/// Substrate rectangle and the dot fields XOR-ed into it, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotFill {
    pub substrate_corner: Point,
    pub substrate_extent: Point,
    pub fields: Vec<DotField>,
}

impl Default for DotFill {
    fn default() -> Self {
        let dot = Dot::new(0.05, 0.0001);
        let fields = [
            (161.0, -79.0, 0.05),
            (161.0, -76.0, 0.0625),
            (161.0, -73.0, 0.075),
            (164.0, -79.0, 0.0875),
            (164.0, -76.0, 0.1),
            (164.0, -73.0, 0.125),
            (167.0, -79.0, 0.15),
        ]
        .into_iter()
        .map(|(x, y, pitch)| DotField {
            origin: Point::new(x, y),
            dot,
            pitch_x: pitch,
            pitch_y: pitch,
            count_x: 11,
            count_y: 11,
        })
        .collect();

        Self {
            substrate_corner: Point::new(160.0, -70.0),
            substrate_extent: Point::new(10.0, -10.0),
            fields,
        }
    }
}

/// Complete description of a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub library_name: String,
    pub top_cell: String,
    pub gds: GdsSettings,
    pub svg: SvgOptions,
    pub hexagons: HexagonArray,
    pub bars: Vec<BarVariant>,
    pub fans: FanSettings,
    pub dots: DotFill,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            library_name: "fab_pattern".to_string(),
            top_cell: "main".to_string(),
            gds: GdsSettings::default(),
            svg: SvgOptions::default(),
            hexagons: HexagonArray::default(),
            bars: vec![
                BarVariant::new(
                    "rectangle_0point1_dy",
                    "rotated_rectangular_0point1_dy",
                    0.05,
                    0.05,
                    0.0,
                ),
                BarVariant::new(
                    "straight_lines_0point1_dy",
                    "rotated_straight_lines_0point1_dy",
                    0.1,
                    0.05,
                    100.0,
                ),
                BarVariant::new(
                    "rectangle_0point2_dy",
                    "rotated_rectangular_0point2_dy",
                    0.1,
                    0.1,
                    200.0,
                ),
                BarVariant::new(
                    "straight_lines_0point2_dy",
                    "rotated_straight_lines_0point2_dy",
                    0.15,
                    0.1,
                    300.0,
                ),
            ],
            fans: FanSettings::default(),
            dots: DotFill::default(),
        }
    }
}

impl Recipe {
    pub fn from_json(json: &str) -> Result<Self, RecipeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let text = fs::read_to_string(path)?;
        let recipe = Self::from_json(&text)?;
        log::info!("loaded recipe '{}' from {}", recipe.library_name, path.display());
        Ok(recipe)
    }

    pub fn to_json(&self) -> Result<String, RecipeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Assembly ─────────────────────────────────────────────────────────

/// Build every cell of the recipe and the top cell that places them.
///
/// Cells are registered bottom-up, so the library's pattern order is also
/// a valid GDS write order.
pub fn assemble(recipe: &Recipe) -> Result<Library, PatternError> {
    let mut library = Library::new(&recipe.library_name);
    let mut top = Pattern::new(&recipe.top_cell);
    let at_origin = Point::new(0.0, 0.0);

    let hexagons = build_hexagons(&mut library, &recipe.hexagons)?;
    place_rotated_copy(&mut top, &hexagons, at_origin, 1.0, 0.0)?;

    for variant in &recipe.bars {
        for cell in build_bar_variant(&mut library, variant, &recipe.fans)? {
            place_rotated_copy(&mut top, &cell, at_origin, 1.0, 0.0)?;
        }
    }

    let fill = &recipe.dots;
    let substrate = rectangle(fill.substrate_corner, fill.substrate_extent)?;
    top.add_shape(layer_dot_fields(&substrate, &fill.fields)?);

    library.add(top)?;
    log::info!(
        "assembled '{}': {} patterns, top '{}'",
        library.name,
        library.pattern_count(),
        recipe.top_cell
    );
    Ok(library)
}

fn build_hexagons(library: &mut Library, array: &HexagonArray) -> Result<PatternRef, PatternError> {
    let mut cell = Pattern::new(&array.cell);
    tile_rings_horizontal(
        &mut cell,
        array.center,
        &array.rings,
        array.pitch_increment,
        array.step,
        array.count,
    )?;
    library.add(cell)
}

/// Register the bar cell, its rotation matrix and its extra fans; return
/// the two fan cells.
fn build_bar_variant(
    library: &mut Library,
    variant: &BarVariant,
    fans: &FanSettings,
) -> Result<[PatternRef; 2], PatternError> {
    let mut bars = Pattern::new(&variant.cell);
    tile_grid(
        &mut bars,
        variant.origin,
        variant.bar,
        variant.bar_pitch,
        variant.row_pitch,
        variant.bars_per_row,
        variant.rows,
    )?;
    let bars = library.add(bars)?;

    let mut matrix = Pattern::new(&variant.rotated_cell);
    rotation_matrix(&mut matrix, &bars, &fans.matrix_at(Point::new(variant.fan_x, 0.0)))?;
    let matrix = library.add(matrix)?;

    let mut extra = Pattern::new(&variant.extra_cell);
    for fan in &fans.extra {
        fan_horizontal(
            &mut extra,
            &bars,
            Point::new(variant.fan_x, fan.y),
            fans.scale,
            fan.angle,
            fans.pitch_x,
            fans.copies_per_row,
        )?;
    }
    let extra = library.add(extra)?;

    Ok([matrix, extra])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same cell layout as the default mask with far less geometry.
    fn small_recipe() -> Recipe {
        let mut recipe = Recipe::default();
        recipe.hexagons.rings.ring_count = 3;
        recipe.hexagons.count = 2;
        for variant in &mut recipe.bars {
            variant.rows = 3;
        }
        recipe.dots.fields.truncate(2);
        for field in &mut recipe.dots.fields {
            field.count_x = 2;
            field.count_y = 2;
        }
        recipe
    }

    #[test]
    fn test_default_recipe() {
        let recipe = Recipe::default();
        assert_eq!(recipe.library_name, "fab_pattern");
        assert_eq!(recipe.bars.len(), 4);
        assert_eq!(recipe.bars[3].extra_cell, "rotated_straight_lines_0point2_dy_1");
        assert_eq!(recipe.dots.fields.len(), 7);
        assert_eq!(recipe.dots.fields[6].pitch_x, 0.15);
        let angles = recipe.fans.matrix_at(Point::new(0.0, 0.0)).angles().unwrap();
        assert_eq!(angles, vec![0.0, 15.0, 30.0, 45.0, 60.0, 75.0, 90.0]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let recipe = Recipe::from_json(
            r#"{"library_name": "trial", "fans": {"copies_per_row": 2}, "hexagons": {"count": 4}}"#,
        )
        .unwrap();
        assert_eq!(recipe.library_name, "trial");
        assert_eq!(recipe.top_cell, "main");
        assert_eq!(recipe.fans.copies_per_row, 2);
        assert_eq!(recipe.fans.angle_step, 15.0);
        assert_eq!(recipe.fans.extra.len(), 2);
        assert_eq!(recipe.hexagons.count, 4);
        assert_eq!(recipe.hexagons.cell, "hexagon");
        assert_eq!(recipe.bars.len(), 4);
    }

    #[test]
    fn test_json_round_trip_and_load() {
        let recipe = small_recipe();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json");
        fs::write(&path, recipe.to_json().unwrap()).unwrap();
        let loaded = Recipe::load(&path).unwrap();
        let cells: Vec<&str> = loaded.bars.iter().map(|b| b.extra_cell.as_str()).collect();
        assert_eq!(cells[2], "rotated_rectangular_0point2_dy_1");
        assert_eq!(loaded.bars[0].rows, 3);
        assert_eq!(loaded.hexagons.count, 2);
        assert_eq!(loaded.dots.fields.len(), 2);
        assert!((loaded.fans.extra[1].angle - 54.74).abs() < 1e-12);

        assert!(matches!(
            Recipe::load(&dir.path().join("missing.json")),
            Err(RecipeError::Io(_))
        ));
        assert!(matches!(Recipe::from_json("{"), Err(RecipeError::Json(_))));
    }

    #[test]
    fn test_assemble_cell_layout() {
        let lib = assemble(&small_recipe()).unwrap();
        assert_eq!(lib.pattern_count(), 1 + 4 * 3 + 1);
        let names = lib.pattern_names();
        assert_eq!(names[0], "hexagon");
        assert_eq!(
            &names[1..4],
            &[
                "rectangle_0point1_dy",
                "rotated_rectangular_0point1_dy",
                "rotated_rectangular_0point1_dy_1"
            ]
        );
        assert_eq!(names.last(), Some(&"main"));

        let tops: Vec<&str> = lib.top_level().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(tops, vec!["main"]);

        let main = lib.find("main").unwrap();
        assert_eq!(main.instance_count(), 1 + 4 * 2);
        assert_eq!(main.shape_count(), 1);

        // 7 angles x 3 copies, and 2 extra fans x 3 copies
        assert_eq!(lib.find("rotated_rectangular_0point2_dy").unwrap().instance_count(), 21);
        assert_eq!(lib.find("rotated_rectangular_0point2_dy_1").unwrap().instance_count(), 6);
        assert_eq!(lib.find("straight_lines_0point2_dy").unwrap().shape_count(), 3);
        assert_eq!(lib.find("hexagon").unwrap().shape_count(), 2);
    }

    #[test]
    fn test_assemble_fan_placement() {
        let lib = assemble(&small_recipe()).unwrap();
        let extra = lib.find("rotated_straight_lines_0point1_dy_1").unwrap();
        let first = &extra.instances()[0].transform;
        assert_eq!(first.origin, Point::new(100.0, -20.0));
        assert_eq!(first.rotation, 35.27);
        let last = &extra.instances()[5].transform;
        assert_eq!(last.origin, Point::new(140.0, -40.0));
        assert_eq!(last.rotation, 54.74);
    }

    #[test]
    fn test_assemble_dot_substrate() {
        let lib = assemble(&small_recipe()).unwrap();
        let main = lib.find("main").unwrap();
        let dotted = &main.shapes()[0].shape;
        assert!(dotted.area() < 100.0);
        assert!(!dotted.contains(&Point::new(161.0, -79.0)));
        assert!(dotted.contains(&Point::new(165.0, -75.0)));
        // substrate plus 2 fields of 2x2 holes
        assert_eq!(dotted.loop_count(), 1 + 8);
    }

    #[test]
    fn test_duplicate_cell_names_rejected() {
        let mut recipe = small_recipe();
        recipe.bars[1].cell = recipe.bars[0].cell.clone();
        assert!(matches!(
            assemble(&recipe),
            Err(PatternError::DuplicateName(name)) if name == "rectangle_0point1_dy"
        ));
    }
}
