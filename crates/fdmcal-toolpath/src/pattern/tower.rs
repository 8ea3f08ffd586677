//! Segmented temperature tower geometry and layer planning.
//!
//! Every segment is one module: a short overhang wall on the left, a long
//! overhang wall on the right, a bridge gap between them holding stringing
//! cones, and a solid slab closing the gap at the top. Walls lean outward as
//! the local height grows. X offsets below are measured from the right edge
//! of the short wall, which stays fixed for the whole print.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolpathError};
use crate::pattern::MAX_SWEEP_STEPS;

/// Width of the short wall at the bottom of a segment (mm).
pub const SHORT_WALL_BASE: f64 = 5.0;
/// Width of the long wall at the bottom of a segment (mm).
pub const LONG_WALL_BASE: f64 = 20.0;
/// Distance from the short wall to the first cone centre (mm).
pub const CONE_INSET: f64 = 5.0;
/// Gap span not used for cone spacing (mm).
const CONE_SPAN_RESERVE: f64 = 10.0;
/// Cones rise over this fraction of the module height.
const CONE_HEIGHT_RATIO: f64 = 0.5;
/// Base diameter of the first cone as a fraction of module depth.
const CONE_FIRST_DIAMETER: f64 = 0.3;
/// Base diameter of the last cone as a fraction of module depth.
const CONE_LAST_DIAMETER: f64 = 0.5;
/// Slack for slab and cone height comparisons (mm).
const HEIGHT_EPSILON: f64 = 1e-6;

/// Geometry of one tower module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerSpec {
    /// Height of each segment (mm).
    pub module_height: f64,
    /// Depth of the tower in Y (mm).
    pub module_depth: f64,
    /// Gap between the walls (mm).
    pub bridge_length: f64,
    /// Thickness of the slab over the gap (mm).
    pub bridge_thick: f64,
    /// Overhang angle of the short wall (degrees).
    pub short_angle: f64,
    /// Overhang angle of the long wall (degrees).
    pub long_angle: f64,
    /// Stringing cones in the gap.
    pub n_cones: u32,
    /// Solid base under the first segment (mm).
    pub base_thick: f64,
}

impl Default for TowerSpec {
    fn default() -> Self {
        Self {
            module_height: 10.0,
            module_depth: 10.0,
            bridge_length: 30.0,
            bridge_thick: 1.0,
            short_angle: 45.0,
            long_angle: 35.0,
            n_cones: 2,
            base_thick: 1.0,
        }
    }
}

/// A stringing cone cross-section on one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeSlice {
    /// Centre X, from the short wall's right edge (mm).
    pub offset_x: f64,
    /// Radius at this height (mm).
    pub radius: f64,
}

impl TowerSpec {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("module_height", self.module_height),
            ("module_depth", self.module_depth),
            ("bridge_length", self.bridge_length),
            ("bridge_thick", self.bridge_thick),
            ("base_thick", self.base_thick),
        ] {
            if !(v > 0.0) {
                return Err(ToolpathError::InvalidSettings(format!(
                    "{name} must be positive"
                )));
            }
        }
        for (name, v) in [("short_angle", self.short_angle), ("long_angle", self.long_angle)] {
            if !(v > 0.0 && v < 90.0) {
                return Err(ToolpathError::InvalidSettings(format!(
                    "{name} must be between 0 and 90 degrees"
                )));
            }
        }
        if self.bridge_thick >= self.module_height {
            return Err(ToolpathError::InvalidSettings(
                "bridge_thick must be less than module_height".into(),
            ));
        }
        if self.n_cones > 1 && self.bridge_length <= CONE_SPAN_RESERVE {
            return Err(ToolpathError::InvalidSettings(format!(
                "bridge_length must exceed {CONE_SPAN_RESERVE} mm to fit several cones"
            )));
        }
        Ok(())
    }

    /// Short wall width at `local_z`.
    pub fn short_wall_width(&self, local_z: f64) -> f64 {
        SHORT_WALL_BASE + local_z / self.short_angle.to_radians().tan()
    }

    /// Long wall width at `local_z`.
    pub fn long_wall_width(&self, local_z: f64) -> f64 {
        LONG_WALL_BASE + local_z / self.long_angle.to_radians().tan()
    }

    /// Widest extent of the short wall.
    pub fn max_short_width(&self) -> f64 {
        self.short_wall_width(self.module_height)
    }

    /// Widest extent of the long wall.
    pub fn max_long_width(&self) -> f64 {
        self.long_wall_width(self.module_height)
    }

    /// Full body width: both walls at their widest plus the gap.
    pub fn body_width(&self) -> f64 {
        self.max_short_width() + self.bridge_length + self.max_long_width()
    }

    /// Height over which the cones taper to a point.
    pub fn cone_height(&self) -> f64 {
        self.module_height * CONE_HEIGHT_RATIO
    }

    /// Cone cross-sections at `local_z`; empty above the cone height.
    pub fn cones(&self, local_z: f64) -> Vec<ConeSlice> {
        let cone_h = self.cone_height();
        if local_z >= cone_h {
            return Vec::new();
        }
        let first = self.module_depth * CONE_FIRST_DIAMETER;
        let last = self.module_depth * CONE_LAST_DIAMETER;
        let (d_step, x_step) = if self.n_cones > 1 {
            let n = (self.n_cones - 1) as f64;
            ((last - first) / n, (self.bridge_length - CONE_SPAN_RESERVE) / n)
        } else {
            (0.0, 0.0)
        };
        (0..self.n_cones)
            .map(|i| {
                let base_radius = (first + i as f64 * d_step) / 2.0;
                ConeSlice {
                    offset_x: CONE_INSET + i as f64 * x_step,
                    radius: base_radius * (1.0 - local_z / cone_h),
                }
            })
            .collect()
    }

    /// Is `local_z` inside the top slab?
    pub fn is_slab(&self, local_z: f64) -> bool {
        local_z >= self.module_height - self.bridge_thick - HEIGHT_EPSILON
    }

    /// `max(1, round(module_height / layer_height))`.
    pub fn layers_per_segment(&self, layer_height: f64) -> usize {
        ((self.module_height / layer_height).round() as usize).max(1)
    }

    /// `max(1, round(base_thick / layer_height))`.
    pub fn base_layers(&self, layer_height: f64) -> usize {
        ((self.base_thick / layer_height).round() as usize).max(1)
    }

    /// Thin passes that build a label `bridge_thick` high.
    pub fn label_passes(&self, layer_height: f64) -> usize {
        ((self.bridge_thick / layer_height).round() as usize).max(1)
    }
}

/// Temperature sweep bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSweep {
    /// Bottom segment temperature (°C).
    pub start: i32,
    /// Top segment temperature (°C).
    pub end: i32,
    /// Step between segments (°C). The direction follows `end`.
    pub step: f64,
}

impl TemperatureSweep {
    /// Reject a zero step, a negative step pointing away from `end`, or a
    /// step too small to reach it in a sane number of segments.
    pub fn validate(&self) -> Result<()> {
        let opposed = self.step < 0.0 && self.end > self.start;
        if self.step == 0.0 || !self.step.is_finite() || opposed {
            return Err(ToolpathError::SweepDirection {
                name: "temperature",
                start: self.start as f64,
                end: self.end as f64,
                step: self.step,
            });
        }
        let steps = (self.end - self.start).abs() as f64 / self.step.abs();
        if !(steps <= MAX_SWEEP_STEPS) {
            return Err(ToolpathError::InvalidSettings(format!(
                "temperature step {} needs more than {MAX_SWEEP_STEPS} segments",
                self.step
            )));
        }
        Ok(())
    }

    /// Segment temperatures, bottom first, and whether the last step is short.
    ///
    /// The sweep always ends on `end`; when the span is not a multiple of the
    /// step an extra segment is appended at `end`.
    pub fn temperatures(&self) -> (Vec<i32>, bool) {
        let step = self.step.abs();
        let direction = if self.end >= self.start { 1.0 } else { -1.0 };
        let span = (self.end - self.start).abs() as f64;
        let full_steps = (span / step).floor() as usize;
        let mut temps: Vec<i32> = (0..=full_steps)
            .map(|i| (self.start as f64 + i as f64 * direction * step).round() as i32)
            .collect();
        let uneven = temps.last() != Some(&self.end);
        if uneven {
            temps.push(self.end);
        }
        (temps, uneven)
    }
}

/// One temperature segment of the tower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position from the bottom.
    pub index: usize,
    /// Hotend temperature (°C).
    pub temperature: i32,
    /// Global layer indices covered.
    pub layers: Range<usize>,
}

/// What a layer of the tower carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    /// Solid base.
    Base,
    /// Tower body inside a segment.
    Body {
        /// Segment index.
        segment: usize,
        /// Layer within the segment.
        layer_in_segment: usize,
    },
    /// Label passes above the top segment.
    LabelOnly {
        /// Pass index.
        pass: usize,
    },
}

/// Layer bookkeeping for a whole tower.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerPlan {
    /// Solid base layers.
    pub base_layers: usize,
    /// Layers per segment.
    pub layers_per_segment: usize,
    /// Segments, bottom first.
    pub segments: Vec<Segment>,
    /// Label passes per segment (0 when labels are off).
    pub label_passes: usize,
}

impl TowerPlan {
    /// Lay out segments for `temperatures` at `layer_height`.
    pub fn new(
        spec: &TowerSpec,
        temperatures: &[i32],
        layer_height: f64,
        labels: bool,
    ) -> Self {
        let base_layers = spec.base_layers(layer_height);
        let layers_per_segment = spec.layers_per_segment(layer_height);
        let segments = temperatures
            .iter()
            .enumerate()
            .map(|(index, &temperature)| {
                let first = base_layers + index * layers_per_segment;
                Segment {
                    index,
                    temperature,
                    layers: first..first + layers_per_segment,
                }
            })
            .collect();
        let label_passes = if labels {
            spec.label_passes(layer_height).min(layers_per_segment)
        } else {
            0
        };
        Self {
            base_layers,
            layers_per_segment,
            segments,
            label_passes,
        }
    }

    /// Base plus every segment, excluding label-only layers.
    pub fn body_layers(&self) -> usize {
        self.base_layers + self.segments.len() * self.layers_per_segment
    }

    /// Every printed layer, including the top label passes.
    pub fn total_layers(&self) -> usize {
        self.body_layers() + self.label_passes
    }

    /// Role of global layer `layer`.
    pub fn role(&self, layer: usize) -> LayerRole {
        if layer < self.base_layers {
            return LayerRole::Base;
        }
        if layer >= self.body_layers() {
            return LayerRole::LabelOnly {
                pass: layer - self.body_layers(),
            };
        }
        let seg_layer = layer - self.base_layers;
        LayerRole::Body {
            segment: seg_layer / self.layers_per_segment,
            layer_in_segment: seg_layer % self.layers_per_segment,
        }
    }

    /// Segment whose label is printed on `layer`, if any.
    ///
    /// A segment's label sits on its slab, so its passes ride on the first
    /// layers of the segment above, or on the label-only layers for the top
    /// segment.
    pub fn label_on(&self, layer: usize) -> Option<&Segment> {
        match self.role(layer) {
            LayerRole::Base => None,
            LayerRole::Body {
                segment,
                layer_in_segment,
            } => {
                if segment > 0 && layer_in_segment < self.label_passes {
                    self.segments.get(segment - 1)
                } else {
                    None
                }
            }
            LayerRole::LabelOnly { .. } => self.segments.last(),
        }
    }

    /// Temperature in effect on `layer`.
    pub fn temperature_at(&self, layer: usize) -> Option<i32> {
        let segment = match self.role(layer) {
            LayerRole::Base => 0,
            LayerRole::Body { segment, .. } => segment,
            LayerRole::LabelOnly { .. } => self.segments.len().checked_sub(1)?,
        };
        self.segments.get(segment).map(|s| s.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_layers_per_segment() {
        let spec = TowerSpec::default();
        assert_eq!(spec.layers_per_segment(0.2), 50);
        assert_eq!(spec.base_layers(0.2), 5);
        let (temps, _) = TemperatureSweep {
            start: 215,
            end: 185,
            step: 5.0,
        }
        .temperatures();
        let plan = TowerPlan::new(&spec, &temps, 0.2, false);
        assert_eq!(plan.segments.len(), 7);
        assert_eq!(plan.body_layers(), 5 + 7 * 50);
        assert_eq!(plan.total_layers(), plan.body_layers());
        for seg in &plan.segments {
            assert_eq!(seg.layers.len(), 50);
        }
        assert_eq!(plan.segments[1].layers.start, 55);
    }

    #[test]
    fn test_layers_floor_at_one() {
        let spec = TowerSpec {
            module_height: 0.05,
            bridge_thick: 0.01,
            base_thick: 0.01,
            ..Default::default()
        };
        assert_eq!(spec.layers_per_segment(0.2), 1);
        assert_eq!(spec.base_layers(0.2), 1);
    }

    #[test]
    fn test_temperatures_even() {
        let (temps, uneven) = TemperatureSweep {
            start: 215,
            end: 185,
            step: 5.0,
        }
        .temperatures();
        assert_eq!(temps, vec![215, 210, 205, 200, 195, 190, 185]);
        assert!(!uneven);
    }

    #[test]
    fn test_temperatures_uneven_lands_on_end() {
        let (temps, uneven) = TemperatureSweep {
            start: 200,
            end: 230,
            step: 7.0,
        }
        .temperatures();
        assert_eq!(temps, vec![200, 207, 214, 221, 228, 230]);
        assert!(uneven);
    }

    #[test]
    fn test_temperature_sweep_validation() {
        let ok = TemperatureSweep {
            start: 215,
            end: 185,
            step: -5.0,
        };
        assert!(ok.validate().is_ok());
        let wrong = TemperatureSweep {
            start: 185,
            end: 215,
            step: -5.0,
        };
        assert!(matches!(
            wrong.validate(),
            Err(ToolpathError::SweepDirection { .. })
        ));
        let zero = TemperatureSweep { step: 0.0, ..ok };
        assert!(zero.validate().is_err());
        let tiny = TemperatureSweep { step: -1e-9, ..ok };
        assert!(matches!(
            tiny.validate(),
            Err(ToolpathError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_wall_growth() {
        let spec = TowerSpec::default();
        assert_relative_eq!(spec.short_wall_width(0.0), 5.0);
        assert_relative_eq!(spec.max_short_width(), 15.0, epsilon = 1e-9);
        assert_relative_eq!(
            spec.max_long_width(),
            20.0 + 10.0 / 35f64.to_radians().tan(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_cones() {
        let spec = TowerSpec::default();
        let base = spec.cones(0.0);
        assert_eq!(base.len(), 2);
        assert_relative_eq!(base[0].radius, 1.5);
        assert_relative_eq!(base[1].radius, 2.5);
        assert_relative_eq!(base[1].offset_x, 25.0);
        let mid = spec.cones(2.5);
        assert_relative_eq!(mid[0].radius, 0.75);
        assert!(spec.cones(5.0).is_empty());
    }

    #[test]
    fn test_slab() {
        let spec = TowerSpec::default();
        assert!(!spec.is_slab(8.8));
        assert!(spec.is_slab(9.0));
        assert!(spec.is_slab(9.8));
    }

    #[test]
    fn test_label_layers() {
        let spec = TowerSpec::default();
        let plan = TowerPlan::new(&spec, &[215, 210], 0.2, true);
        assert_eq!(plan.label_passes, 5);
        assert_eq!(plan.total_layers(), plan.body_layers() + 5);
        // first layers of segment 1 carry segment 0's label
        assert_eq!(plan.label_on(55).map(|s| s.temperature), Some(215));
        assert_eq!(plan.label_on(59).map(|s| s.temperature), Some(215));
        assert!(plan.label_on(60).is_none());
        assert!(plan.label_on(10).is_none());
        // the top segment's label goes on extra layers
        let top = plan.body_layers();
        assert_eq!(plan.role(top), LayerRole::LabelOnly { pass: 0 });
        assert_eq!(plan.label_on(top).map(|s| s.temperature), Some(210));
        assert_eq!(plan.temperature_at(top), Some(210));
        assert_eq!(plan.temperature_at(0), Some(215));
    }
}
