//! Nested V-corner geometry for pressure-advance patterns.
//!
//! Each wall is a two-leg chevron opening to the right. Wall `w` is shifted
//! by `w · spacing` along `(sin(half), −cos(half))`, perpendicular to the
//! left leg, so the walls nest toward the symmetry axis. Vertices are placed
//! so the pattern's bounding box starts exactly at the requested origin.

use serde::{Deserialize, Serialize};

use crate::command::{round_to, PA_PLACES};
use crate::error::{Result, ToolpathError};
use crate::path::{BoundingBox, Point2, Polyline};
use crate::pattern::MAX_SWEEP_STEPS;

/// Geometry of one V-corner pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VCornerSpec {
    /// Length of each leg (mm).
    pub side_length: f64,
    /// Number of nested walls.
    pub wall_count: u32,
    /// Angle at the apex (degrees).
    pub corner_angle: f64,
    /// Distance between adjacent walls (mm).
    pub spacing: f64,
}

impl VCornerSpec {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.wall_count < 1 {
            return Err(ToolpathError::InvalidSettings(
                "wall_count must be at least 1".into(),
            ));
        }
        if !(self.corner_angle > 0.0 && self.corner_angle < 180.0) {
            return Err(ToolpathError::InvalidSettings(
                "corner_angle must be between 0 and 180 degrees".into(),
            ));
        }
        if self.side_length <= 0.0 {
            return Err(ToolpathError::InvalidSettings(
                "side_length must be positive".into(),
            ));
        }
        if self.spacing <= 0.0 {
            return Err(ToolpathError::InvalidSettings(
                "wall spacing must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Leg angle above the horizontal, in radians.
    pub fn half_angle(&self) -> f64 {
        ((180.0 - self.corner_angle) / 2.0).to_radians()
    }

    fn wall_spread(&self) -> f64 {
        (self.wall_count.max(1) - 1) as f64 * self.spacing
    }

    /// Bounding-box width.
    pub fn width(&self) -> f64 {
        let half = self.half_angle();
        2.0 * self.side_length * half.cos() + self.wall_spread() * half.sin()
    }

    /// Bounding-box height.
    pub fn height(&self) -> f64 {
        let half = self.half_angle();
        self.side_length * half.sin() + self.wall_spread() * half.cos()
    }

    /// Bounding box when placed at `origin`.
    pub fn bounding_box(&self, origin: Point2) -> BoundingBox {
        BoundingBox::from_origin(origin, self.width(), self.height())
    }

    /// Wall polylines (start, apex, end), outermost first.
    pub fn walls(&self, origin: Point2) -> Vec<Polyline> {
        let half = self.half_angle();
        let (s, c) = half.sin_cos();
        let leg_x = self.side_length * c;
        let leg_y = self.side_length * s;
        let top = origin.y + self.wall_spread() * c;

        (0..self.wall_count)
            .map(|w| {
                let off = w as f64 * self.spacing;
                let p0 = Point2::new(origin.x + s * off, top - c * off);
                let p1 = Point2::new(p0.x + leg_x, p0.y + leg_y);
                let p2 = Point2::new(p1.x + leg_x, p1.y - leg_y);
                Polyline::new(vec![p0, p1, p2])
            })
            .collect()
    }

    /// Largest side length whose pattern is at most `width` × `height`.
    pub fn max_side_length(&self, width: f64, height: f64) -> f64 {
        let half = self.half_angle();
        let (s, c) = half.sin_cos();
        let by_width = (width - self.wall_spread() * s) / (2.0 * c);
        let by_height = (height - self.wall_spread() * c) / s;
        by_width.min(by_height)
    }
}

/// The run of pressure-advance values, one per pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvanceSweep {
    /// First value.
    pub start: f64,
    /// Last value.
    pub end: f64,
    /// Increment between patterns.
    pub step: f64,
}

impl AdvanceSweep {
    /// Reject a zero step, a step pointing away from `end`, or one too
    /// small to reach it in a sane number of patterns.
    pub fn validate(&self) -> Result<()> {
        let span = self.end - self.start;
        let opposed = span != 0.0 && span.signum() != self.step.signum();
        if self.step == 0.0 || !self.step.is_finite() || opposed {
            return Err(ToolpathError::SweepDirection {
                name: "pressure advance",
                start: self.start,
                end: self.end,
                step: self.step,
            });
        }
        let steps = (span / self.step).abs();
        if !(steps <= MAX_SWEEP_STEPS) {
            return Err(ToolpathError::InvalidSettings(format!(
                "pressure advance step {} needs more than {MAX_SWEEP_STEPS} patterns",
                self.step
            )));
        }
        Ok(())
    }

    /// `round((end − start) / step) + 1`.
    ///
    /// Not clamped: when the step does not divide the span the last value
    /// may fall short of or past `end`.
    pub fn pattern_count(&self) -> usize {
        ((self.end - self.start) / self.step).round().max(0.0) as usize + 1
    }

    /// Value for pattern `index`, computed from the index alone.
    pub fn value(&self, index: usize) -> f64 {
        round_to(self.start + index as f64 * self.step, PA_PLACES)
    }

    /// Every pattern value in order.
    pub fn values(&self) -> Vec<f64> {
        (0..self.pattern_count()).map(|i| self.value(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn spec() -> VCornerSpec {
        VCornerSpec {
            side_length: 20.0,
            wall_count: 3,
            corner_angle: 90.0,
            spacing: 0.45 - 0.2 * (1.0 - std::f64::consts::PI / 4.0),
        }
    }

    fn vertex_box(spec: &VCornerSpec, origin: Point2) -> BoundingBox {
        let walls = spec.walls(origin);
        BoundingBox::of_points(walls.iter().flat_map(|w| w.points.iter())).unwrap()
    }

    #[test]
    fn test_right_angle_extent() {
        let spec = spec();
        let half = std::f64::consts::FRAC_PI_4;
        assert_relative_eq!(spec.half_angle(), half, epsilon = 1e-12);
        assert_relative_eq!(
            spec.width(),
            40.0 * half.cos() + 2.0 * spec.spacing * half.sin(),
            epsilon = 1e-12
        );
        let b = vertex_box(&spec, Point2::new(5.0, 7.0));
        assert_relative_eq!(b.min.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(b.min.y, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_walls_nest() {
        let walls = spec().walls(Point2::new(0.0, 0.0));
        assert_eq!(walls.len(), 3);
        // apexes move right and down, toward the symmetry axis
        assert!(walls[1].points[1].x > walls[0].points[1].x);
        assert!(walls[1].points[1].y < walls[0].points[1].y);
    }

    #[test]
    fn test_validate() {
        assert!(spec().validate().is_ok());
        let bad = VCornerSpec {
            wall_count: 0,
            ..spec()
        };
        assert!(bad.validate().is_err());
        let flat = VCornerSpec {
            corner_angle: 180.0,
            ..spec()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_advance_values() {
        let sweep = AdvanceSweep {
            start: 0.0,
            end: 4.0,
            step: 1.0,
        };
        assert_eq!(sweep.pattern_count(), 5);
        assert_eq!(sweep.values(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_advance_values_no_drift() {
        let step = std::f64::consts::PI / 100.0;
        let sweep = AdvanceSweep {
            start: 0.0,
            end: step * 999.0,
            step,
        };
        assert_eq!(sweep.pattern_count(), 1000);
        for i in [0usize, 1, 10, 500, 999] {
            assert_eq!(sweep.value(i), round_to(i as f64 * step, PA_PLACES));
        }
    }

    #[test]
    fn test_pattern_count_uneven_step() {
        // 1 / 0.6 rounds up: the third pattern overshoots the end
        let sweep = AdvanceSweep {
            start: 0.0,
            end: 1.0,
            step: 0.6,
        };
        assert_eq!(sweep.pattern_count(), 3);
        assert_eq!(sweep.values(), vec![0.0, 0.6, 1.2]);

        // 1 / 0.3 rounds down: the end value is never reached
        let short = AdvanceSweep { step: 0.3, ..sweep };
        assert_eq!(short.pattern_count(), 4);
        assert_eq!(short.value(3), 0.9);
    }

    #[test]
    fn test_sweep_direction() {
        let down = AdvanceSweep {
            start: 0.1,
            end: 0.0,
            step: -0.02,
        };
        assert!(down.validate().is_ok());
        assert_eq!(down.pattern_count(), 6);

        let wrong = AdvanceSweep { step: 0.02, ..down };
        assert!(matches!(
            wrong.validate(),
            Err(ToolpathError::SweepDirection { .. })
        ));
        let zero = AdvanceSweep { step: 0.0, ..down };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_sweep_step_too_small() {
        let tiny = AdvanceSweep {
            start: 0.0,
            end: 0.1,
            step: 1e-12,
        };
        assert!(matches!(
            tiny.validate(),
            Err(ToolpathError::InvalidSettings(_))
        ));
        let infinite = AdvanceSweep {
            end: f64::INFINITY,
            step: 0.01,
            ..tiny
        };
        assert!(infinite.validate().is_err());
        let fine = AdvanceSweep {
            step: 0.0001,
            ..tiny
        };
        assert!(fine.validate().is_ok());
        assert_eq!(fine.pattern_count(), 1001);
    }

    #[test]
    fn test_max_side_length_fits() {
        let spec = spec();
        let l = spec.max_side_length(30.0, 50.0);
        let fitted = VCornerSpec {
            side_length: l,
            ..spec
        };
        assert!(fitted.width() <= 30.0 + 1e-9);
        assert!(fitted.height() <= 50.0 + 1e-9);
    }

    proptest! {
        #[test]
        fn prop_bounding_box_matches_vertices(
            side_length in 1.0f64..80.0,
            wall_count in 1u32..12,
            corner_angle in 5.0f64..175.0,
            spacing in 0.1f64..1.5,
            ox in -50.0f64..200.0,
            oy in -50.0f64..200.0,
        ) {
            let spec = VCornerSpec { side_length, wall_count, corner_angle, spacing };
            let origin = Point2::new(ox, oy);
            let analytic = spec.bounding_box(origin);
            let actual = vertex_box(&spec, origin);
            prop_assert!((analytic.min.x - actual.min.x).abs() < 1e-9);
            prop_assert!((analytic.min.y - actual.min.y).abs() < 1e-9);
            prop_assert!((analytic.max.x - actual.max.x).abs() < 1e-9);
            prop_assert!((analytic.max.y - actual.max.y).abs() < 1e-9);
        }
    }
}
