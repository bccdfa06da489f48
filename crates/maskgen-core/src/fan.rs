//! Rotated and magnified instance arrays of a source pattern.
//!
//! A fan is a row of copies that all share one angle; only the X position
//! changes along the row. A rotation matrix stacks fans vertically, one per
//! angle.

use serde::{Deserialize, Serialize};

use crate::error::{require_count, require_finite, PatternError, Result};
use crate::geometry::Point;
use crate::pattern::{Instance, Pattern, PatternRef, Transform};

/// Instance `source` into `target` at `origin`, rotated by `angle_degrees`
/// and magnified by `scale`.
pub fn place_rotated_copy(
    target: &mut Pattern,
    source: &PatternRef,
    origin: Point,
    scale: f64,
    angle_degrees: f64,
) -> Result<()> {
    check_placement(target, source, origin, scale, angle_degrees)?;
    target.add_instance(Instance::new(
        source.clone(),
        Transform::new(origin, angle_degrees, scale),
    ));
    Ok(())
}

/// Place `count` copies of `source` at the same angle, stepping `pitch_x`
/// along X.
pub fn fan_horizontal(
    target: &mut Pattern,
    source: &PatternRef,
    origin: Point,
    scale: f64,
    angle_degrees: f64,
    pitch_x: f64,
    count: usize,
) -> Result<()> {
    require_count("copies per fan", count)?;
    require_finite("fan pitch", &[pitch_x])?;
    check_placement(target, source, origin, scale, angle_degrees)?;

    for k in 0..count {
        let at = origin.translate(k as f64 * pitch_x, 0.0);
        place_rotated_copy(target, source, at, scale, angle_degrees)?;
    }
    log::debug!(
        "pattern '{}': fan of {} x '{}' at {} deg",
        target.name,
        count,
        source.name,
        angle_degrees
    );
    Ok(())
}

/// Most rows a single rotation matrix may emit.
pub const MAX_ROTATION_ROWS: usize = 10_000;

/// Layout of a rotation matrix: one fan per angle, rows `pitch_y` apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationMatrix {
    pub origin: Point,
    pub scale: f64,
    pub start_angle: f64,
    pub final_angle: f64,
    pub angle_step: f64,
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub copies_per_row: usize,
}

impl RotationMatrix {
    /// Row angles: `start_angle + k * angle_step` up to and including the
    /// first angle that reaches `final_angle`.
    ///
    /// The last row may overshoot `final_angle`. If `start_angle` already
    /// reaches it, a single row is emitted. Layouts needing more than
    /// [`MAX_ROTATION_ROWS`] rows are rejected before any angle is computed.
    pub fn angles(&self) -> Result<Vec<f64>> {
        require_finite(
            "rotation matrix angles",
            &[self.start_angle, self.final_angle, self.angle_step],
        )?;
        if self.start_angle < self.final_angle && self.angle_step <= 0.0 {
            return Err(PatternError::InvalidParameter(format!(
                "angle step {} never reaches {} from {}",
                self.angle_step, self.final_angle, self.start_angle
            )));
        }

        if self.start_angle >= self.final_angle {
            return Ok(vec![self.start_angle]);
        }

        let steps = ((self.final_angle - self.start_angle) / self.angle_step).ceil();
        if !steps.is_finite() || steps >= MAX_ROTATION_ROWS as f64 {
            return Err(PatternError::InvalidParameter(format!(
                "{} to {} by {} needs more than {MAX_ROTATION_ROWS} rows",
                self.start_angle, self.final_angle, self.angle_step
            )));
        }

        // one spare row absorbs rounding in the step count
        let mut angles = Vec::with_capacity(steps as usize + 2);
        for row in 0..=(steps as usize + 1) {
            let angle = self.start_angle + row as f64 * self.angle_step;
            angles.push(angle);
            if angle >= self.final_angle {
                break;
            }
        }
        Ok(angles)
    }
}

/// Emit one fan per angle of `layout`, returning the angles in row order.
pub fn rotation_matrix(
    target: &mut Pattern,
    source: &PatternRef,
    layout: &RotationMatrix,
) -> Result<Vec<f64>> {
    let angles = layout.angles()?;
    require_count("copies per fan", layout.copies_per_row)?;
    require_finite("rotation matrix pitch", &[layout.pitch_x, layout.pitch_y])?;
    check_placement(target, source, layout.origin, layout.scale, 0.0)?;

    for (row, &angle) in angles.iter().enumerate() {
        let row_origin = layout.origin.translate(0.0, row as f64 * layout.pitch_y);
        fan_horizontal(
            target,
            source,
            row_origin,
            layout.scale,
            angle,
            layout.pitch_x,
            layout.copies_per_row,
        )?;
    }
    log::info!(
        "pattern '{}': rotation matrix of '{}' with {} rows",
        target.name,
        source.name,
        angles.len()
    );
    Ok(angles)
}

fn check_placement(
    target: &Pattern,
    source: &PatternRef,
    origin: Point,
    scale: f64,
    angle_degrees: f64,
) -> Result<()> {
    if source.id == target.id {
        return Err(PatternError::InvalidParameter(format!(
            "pattern '{}' cannot instance itself",
            target.name
        )));
    }
    require_finite("placement", &[origin.x, origin.y, angle_degrees])?;
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PatternError::InvalidParameter(format!(
            "magnification must be positive, got {scale}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(start: f64, end: f64, step: f64) -> RotationMatrix {
        RotationMatrix {
            origin: Point::new(0.0, 0.0),
            scale: 1.0,
            start_angle: start,
            final_angle: end,
            angle_step: step,
            pitch_x: 20.0,
            pitch_y: 20.0,
            copies_per_row: 3,
        }
    }

    #[test]
    fn test_place_rotated_copy() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("rotated");
        place_rotated_copy(&mut target, &source.reference(), Point::new(1.0, 2.0), 2.0, 35.27)
            .unwrap();
        assert_eq!(target.instance_count(), 1);
        let inst = &target.instances()[0];
        assert_eq!(inst.pattern.name, "bars");
        assert_eq!(inst.transform.rotation, 35.27);
        assert_eq!(inst.transform.magnification, 2.0);
        assert_eq!(inst.transform.origin, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_self_instance_rejected() {
        let mut p = Pattern::new("loop");
        let me = p.reference();
        assert!(matches!(
            place_rotated_copy(&mut p, &me, Point::new(0.0, 0.0), 1.0, 0.0),
            Err(PatternError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fan_shares_one_angle() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("fan");
        fan_horizontal(&mut target, &source.reference(), Point::new(0.0, -20.0), 1.0, 54.74, 20.0, 3)
            .unwrap();
        assert_eq!(target.instance_count(), 3);
        for (k, inst) in target.instances().iter().enumerate() {
            assert_eq!(inst.transform.rotation, 54.74);
            assert!((inst.transform.origin.x - 20.0 * k as f64).abs() < 1e-12);
            assert_eq!(inst.transform.origin.y, -20.0);
        }
    }

    #[test]
    fn test_fan_count_one() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("fan");
        fan_horizontal(&mut target, &source.reference(), Point::new(0.0, 0.0), 1.0, 0.0, 20.0, 1)
            .unwrap();
        assert_eq!(target.element_count(), 1);
    }

    #[test]
    fn test_rotation_matrix_inclusive_rows() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("matrix");
        let angles = rotation_matrix(&mut target, &source.reference(), &layout(0.0, 90.0, 15.0))
            .unwrap();
        assert_eq!(angles, vec![0.0, 15.0, 30.0, 45.0, 60.0, 75.0, 90.0]);
        assert_eq!(target.instance_count(), 21);

        let last = &target.instances()[20];
        assert_eq!(last.transform.rotation, 90.0);
        assert!((last.transform.origin.y - 120.0).abs() < 1e-12);
        assert!((last.transform.origin.x - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_matrix_overshoot_row() {
        let angles = layout(0.0, 80.0, 15.0).angles().unwrap();
        assert_eq!(angles, vec![0.0, 15.0, 30.0, 45.0, 60.0, 75.0, 90.0]);
    }

    #[test]
    fn test_rotation_matrix_start_past_final() {
        let angles = layout(90.0, 0.0, 15.0).angles().unwrap();
        assert_eq!(angles, vec![90.0]);
        // a zero step is harmless when no stepping is needed
        assert_eq!(layout(45.0, 45.0, 0.0).angles().unwrap(), vec![45.0]);
    }

    #[test]
    fn test_rotation_matrix_zero_step_fails_fast() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("matrix");
        let err = rotation_matrix(&mut target, &source.reference(), &layout(0.0, 90.0, 0.0));
        assert!(matches!(err, Err(PatternError::InvalidParameter(_))));
        assert_eq!(target.instance_count(), 0);
        assert!(layout(0.0, 90.0, -15.0).angles().is_err());
    }

    #[test]
    fn test_rotation_matrix_row_cap() {
        assert!(matches!(
            layout(0.0, 1e12, 1e-3).angles(),
            Err(PatternError::InvalidParameter(_))
        ));
        assert!(matches!(
            layout(0.0, f64::MAX, 1.0).angles(),
            Err(PatternError::InvalidParameter(_))
        ));
        assert!(matches!(
            layout(-f64::MAX, f64::MAX, 1.0).angles(),
            Err(PatternError::InvalidParameter(_))
        ));
        let rows = layout(0.0, (MAX_ROTATION_ROWS - 2) as f64, 1.0).angles().unwrap();
        assert_eq!(rows.len(), MAX_ROTATION_ROWS - 1);
    }

    #[test]
    fn test_bad_magnification() {
        let source = Pattern::new("bars");
        let mut target = Pattern::new("fan");
        assert!(fan_horizontal(&mut target, &source.reference(), Point::new(0.0, 0.0), 0.0, 0.0, 1.0, 2)
            .is_err());
        assert_eq!(target.instance_count(), 0);
    }
}
