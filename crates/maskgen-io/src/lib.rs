//! # MaskGen I/O
//!
//! Output formats for a pattern [`Library`](maskgen_core::Library): the
//! GDS-II stream a mask shop consumes and an SVG preview of a top cell.
//! Also holds the JSON mask recipe and the assembly of a recipe into a
//! library.

pub mod gds;
pub mod recipe;
pub mod svg;

pub use gds::{GdsError, GdsSettings, GdsWriter};
pub use recipe::{assemble, Recipe, RecipeError};
pub use svg::{render_svg, write_svg, SvgError, SvgOptions};
