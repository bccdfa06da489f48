//! # MaskGen Core
//!
//! Pattern-composition engine for lithography mask layouts: concentric
//! ring targets built by XOR accumulation, bar arrays, fans of rotated
//! instances and dot fields, plus the pattern hierarchy they are installed
//! into.
//!
//! Every builder is an append-only fold over a caller-owned [`Pattern`] or a
//! pure function returning a new [`Shape`]. Counts, steps and pitches are
//! checked before any geometry is built.

pub mod error;
pub mod geometry;
pub mod primitives;
pub mod boolean;
pub mod rings;
pub mod array;
pub mod fan;
pub mod dots;
pub mod pattern;
pub mod library;

pub use error::{PatternError, Result};
pub use geometry::{BBox, Point, Shape};
pub use library::{FlatShape, Library};
pub use pattern::{Instance, Layer, Pattern, PatternId, PatternRef, Transform};
