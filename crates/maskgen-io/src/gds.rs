//! GDS-II stream writer.
//!
//! Each record: [2-byte length][2-byte record type][payload]. A library is
//! HEADER, BGNLIB, LIBNAME, UNITS, then one BGNSTR … ENDSTR block per
//! pattern, then ENDLIB. Patterns are written in registration order, so every
//! structure follows the structures it references.

use std::io;

use geo::{BooleanOps, BoundingRect, Coord, Polygon, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use maskgen_core::{Instance, Layer, Library, Pattern};

// ── GDS-II Record Types ──────────────────────────────────────────────

pub(crate) mod record_type {
    pub const HEADER: u16 = 0x0002;
    pub const BGNLIB: u16 = 0x0102;
    pub const LIBNAME: u16 = 0x0206;
    pub const UNITS: u16 = 0x0305;
    pub const ENDLIB: u16 = 0x0400;
    pub const BGNSTR: u16 = 0x0502;
    pub const STRNAME: u16 = 0x0606;
    pub const ENDSTR: u16 = 0x0700;
    pub const BOUNDARY: u16 = 0x0800;
    pub const SREF: u16 = 0x0A00;
    pub const LAYER: u16 = 0x0D02;
    pub const DATATYPE: u16 = 0x0E02;
    pub const XY: u16 = 0x1003;
    pub const ENDEL: u16 = 0x1100;
    pub const SNAME: u16 = 0x1206;
    pub const STRANS: u16 = 0x1A01;
    pub const MAG: u16 = 0x1B05;
    pub const ANGLE: u16 = 0x1C05;
}

/// Most distinct vertices a BOUNDARY may carry (8191 points with closure).
pub const MAX_POINTS: usize = 8190;

/// Fracturing gives up splitting past this depth.
const MAX_FRACTURE_DEPTH: usize = 32;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Coordinate {value} does not fit the database grid")]
    CoordinateOverflow { value: f64 },

    #[error("Record of {0} bytes exceeds the GDS-II record limit")]
    RecordTooLong(usize),

    #[error("Polygon with {holes} holes and {vertices} vertices could not be fractured")]
    Fracture { holes: usize, vertices: usize },

    #[error("Layer/datatype {0} does not fit a GDS-II 16-bit field")]
    LayerOutOfRange(u16),
}

// ── Settings ──────────────────────────────────────────────────────────

/// Units and timestamp written to the library header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdsSettings {
    /// User unit in micrometers.
    pub user_unit_um: f64,
    /// Database grid in micrometers.
    pub db_unit_um: f64,
    /// Year, month, day, hour, minute, second for BGNLIB/BGNSTR.
    pub timestamp: [i16; 6],
}

impl Default for GdsSettings {
    fn default() -> Self {
        Self {
            user_unit_um: 1.0,
            db_unit_um: 0.001,
            timestamp: [2024, 3, 31, 0, 0, 0],
        }
    }
}

// ── Real8 ─────────────────────────────────────────────────────────────

/// Convert IEEE 754 f64 to GDS-II excess-64 real format.
pub(crate) fn f64_to_gds_real8(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }

    let sign_bit: u8 = if value < 0.0 { 0x80 } else { 0x00 };
    let mut val = value.abs();

    // 1/16 <= mantissa < 1
    let mut exponent: i32 = 0;
    while val >= 1.0 && exponent < 63 {
        val /= 16.0;
        exponent += 1;
    }
    while val < 1.0 / 16.0 && exponent > -64 {
        val *= 16.0;
        exponent -= 1;
    }

    let mantissa = (val * (1u64 << 56) as f64) as u64;
    let mut result = [0u8; 8];
    result[0] = sign_bit | ((exponent + 64) as u8 & 0x7F);
    result[1..].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    result
}

// ── Fracturing ────────────────────────────────────────────────────────

/// Split `polygon` into hole-free pieces of at most `MAX_POINTS` vertices.
///
/// Holes are opened by a vertical cut through the median hole center, so
/// every cut consumes a whole column of holes and halves the rest. Oversized
/// hole-free pieces are cut through the middle of their bounding box.
pub fn fracture(polygon: Polygon<f64>) -> Result<Vec<Polygon<f64>>, GdsError> {
    let mut out = Vec::new();
    fracture_into(polygon, 0, &mut out)?;
    Ok(out)
}

fn fracture_into(
    polygon: Polygon<f64>,
    depth: usize,
    out: &mut Vec<Polygon<f64>>,
) -> Result<(), GdsError> {
    let Some(bounds) = polygon.bounding_rect() else {
        return Ok(());
    };
    let vertex_count = polygon.exterior().0.len().saturating_sub(1);

    let cut_x = if !polygon.interiors().is_empty() {
        median_hole_x(&polygon).unwrap_or_else(|| bounds.center().x)
    } else if vertex_count > MAX_POINTS {
        bounds.center().x
    } else {
        out.push(polygon);
        return Ok(());
    };

    if depth >= MAX_FRACTURE_DEPTH {
        return Err(GdsError::Fracture {
            holes: polygon.interiors().len(),
            vertices: vertex_count,
        });
    }

    let pad = bounds.width().max(bounds.height()).max(1.0);
    let (lo_y, hi_y) = (bounds.min().y - pad, bounds.max().y + pad);
    let left = Rect::new(
        Coord { x: bounds.min().x - pad, y: lo_y },
        Coord { x: cut_x, y: hi_y },
    )
    .to_polygon();
    let right = Rect::new(
        Coord { x: cut_x, y: lo_y },
        Coord { x: bounds.max().x + pad, y: hi_y },
    )
    .to_polygon();

    for piece in polygon
        .intersection(&left)
        .into_iter()
        .chain(polygon.intersection(&right))
    {
        fracture_into(piece, depth + 1, out)?;
    }
    Ok(())
}

fn median_hole_x(polygon: &Polygon<f64>) -> Option<f64> {
    let mut centers: Vec<f64> = polygon
        .interiors()
        .iter()
        .filter_map(|hole| hole.bounding_rect())
        .map(|hb| hb.center().x)
        .collect();
    if centers.is_empty() {
        return None;
    }
    centers.sort_by(f64::total_cmp);
    Some(centers[centers.len() / 2])
}

fn gds_i16(value: u16) -> Result<i16, GdsError> {
    i16::try_from(value).map_err(|_| GdsError::LayerOutOfRange(value))
}

// ── GDS-II Writer ─────────────────────────────────────────────────────

pub struct GdsWriter<W: io::Write> {
    writer: W,
    settings: GdsSettings,
}

impl<W: io::Write> GdsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_settings(writer, GdsSettings::default())
    }

    pub fn with_settings(writer: W, settings: GdsSettings) -> Self {
        Self { writer, settings }
    }

    /// Write every pattern of `library` as a GDS-II stream.
    pub fn write(&mut self, library: &Library) -> Result<(), GdsError> {
        self.write_i16_record(record_type::HEADER, &[600])?;
        let stamp = self.stamp();
        self.write_i16_record(record_type::BGNLIB, &stamp)?;
        self.write_string_record(record_type::LIBNAME, &library.name)?;
        self.write_real8_record(
            record_type::UNITS,
            &[
                self.settings.db_unit_um / self.settings.user_unit_um,
                self.settings.db_unit_um * 1e-6,
            ],
        )?;

        for pattern in library.patterns() {
            self.write_pattern(pattern)?;
        }

        self.write_record(record_type::ENDLIB, &[])?;
        self.writer.flush()?;
        log::info!(
            "wrote GDS-II library '{}' with {} structures",
            library.name,
            library.pattern_count()
        );
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn stamp(&self) -> [i16; 12] {
        let mut stamp = [0i16; 12];
        stamp[..6].copy_from_slice(&self.settings.timestamp);
        stamp[6..].copy_from_slice(&self.settings.timestamp);
        stamp
    }

    fn write_pattern(&mut self, pattern: &Pattern) -> Result<(), GdsError> {
        let stamp = self.stamp();
        self.write_i16_record(record_type::BGNSTR, &stamp)?;
        self.write_string_record(record_type::STRNAME, &pattern.name)?;

        let mut boundaries = 0usize;
        for drawn in pattern.shapes() {
            for polygon in drawn.shape.region().iter() {
                for piece in fracture(polygon.clone())? {
                    self.write_boundary(drawn.layer, &piece)?;
                    boundaries += 1;
                }
            }
        }
        for inst in pattern.instances() {
            self.write_sref(inst)?;
        }

        self.write_record(record_type::ENDSTR, &[])?;
        log::debug!(
            "structure '{}': {} boundaries, {} references",
            pattern.name,
            boundaries,
            pattern.instance_count()
        );
        Ok(())
    }

    fn write_boundary(&mut self, layer: Layer, polygon: &Polygon<f64>) -> Result<(), GdsError> {
        // closed ring: at least three corners plus the repeated first point
        if polygon.exterior().0.len() < 4 {
            return Ok(());
        }
        if !polygon.interiors().is_empty() {
            return Err(GdsError::Fracture {
                holes: polygon.interiors().len(),
                vertices: polygon.exterior().0.len() - 1,
            });
        }
        let gds_layer = gds_i16(layer.layer)?;
        let gds_datatype = gds_i16(layer.datatype)?;
        let mut coords = Vec::with_capacity(polygon.exterior().0.len() * 2);
        for c in polygon.exterior().coords() {
            coords.push(self.to_db(c.x)?);
            coords.push(self.to_db(c.y)?);
        }

        self.write_record(record_type::BOUNDARY, &[])?;
        self.write_i16_record(record_type::LAYER, &[gds_layer])?;
        self.write_i16_record(record_type::DATATYPE, &[gds_datatype])?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])?;
        Ok(())
    }

    fn write_sref(&mut self, inst: &Instance) -> Result<(), GdsError> {
        let t = &inst.transform;

        self.write_record(record_type::SREF, &[])?;
        self.write_string_record(record_type::SNAME, &inst.pattern.name)?;

        if t.rotation != 0.0 || t.magnification != 1.0 {
            self.write_i16_record(record_type::STRANS, &[0])?;
        }
        if t.magnification != 1.0 {
            self.write_real8_record(record_type::MAG, &[t.magnification])?;
        }
        if t.rotation != 0.0 {
            self.write_real8_record(record_type::ANGLE, &[t.rotation])?;
        }

        let xy = [self.to_db(t.origin.x)?, self.to_db(t.origin.y)?];
        self.write_i32_record(record_type::XY, &xy)?;
        self.write_record(record_type::ENDEL, &[])?;
        Ok(())
    }

    /// User units to the integer database grid.
    fn to_db(&self, value: f64) -> Result<i32, GdsError> {
        let scaled = (value * self.settings.user_unit_um / self.settings.db_unit_um).round();
        if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(GdsError::CoordinateOverflow { value });
        }
        Ok(scaled as i32)
    }

    fn write_record(&mut self, record_type: u16, data: &[u8]) -> Result<(), GdsError> {
        let total_len = data.len() + 4;
        if total_len > u16::MAX as usize {
            return Err(GdsError::RecordTooLong(total_len));
        }
        self.writer.write_all(&(total_len as u16).to_be_bytes())?;
        self.writer.write_all(&record_type.to_be_bytes())?;
        if !data.is_empty() {
            self.writer.write_all(data)?;
        }
        Ok(())
    }

    fn write_i16_record(&mut self, record_type: u16, values: &[i16]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_i32_record(&mut self, record_type: u16, values: &[i32]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_string_record(&mut self, record_type: u16, s: &str) -> Result<(), GdsError> {
        let mut data: Vec<u8> = s.bytes().collect();
        // GDS strings must be even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        self.write_record(record_type, &data)
    }

    fn write_real8_record(&mut self, record_type: u16, values: &[f64]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| f64_to_gds_real8(*v)).collect();
        self.write_record(record_type, &data)
    }
}
