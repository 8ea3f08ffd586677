//! Filament length for a deposited bead.
//!
//! The bead is modelled as a rectangle `line_width × layer_height` whose
//! ends are rounded into half circles of diameter `layer_height`, which is
//! the same cross-section that gives the perimeter spacing in
//! [`line_spacing`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::command::{round_to, E_PLACES};

/// Centre-to-centre distance of two adjacent beads.
///
/// `line_width − layer_height · (1 − π/4)`
pub fn line_spacing(line_width: f64, layer_height: f64) -> f64 {
    line_width - layer_height * (1.0 - PI / 4.0)
}

/// Cross-section area of a bead (mm²).
pub fn bead_area(line_width: f64, layer_height: f64) -> f64 {
    layer_height * line_spacing(line_width, layer_height)
}

/// Cross-section area of the filament (mm²).
pub fn filament_area(filament_diameter: f64) -> f64 {
    let r = filament_diameter / 2.0;
    PI * r * r
}

/// Filament length needed to lay down `distance` mm of bead.
///
/// The result is rounded to the extrusion precision so equal inputs give
/// identical output.
pub fn extrusion_length(
    distance: f64,
    layer_height: f64,
    line_width: f64,
    filament_diameter: f64,
    multiplier: f64,
) -> f64 {
    let volume = distance * bead_area(line_width, layer_height);
    round_to(volume / filament_area(filament_diameter) * multiplier, E_PLACES)
}

/// Filament geometry and flow multiplier shared by every bead of a print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionModel {
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Flow multiplier.
    pub multiplier: f64,
}

impl Default for ExtrusionModel {
    fn default() -> Self {
        Self {
            filament_diameter: 1.75,
            multiplier: 0.98,
        }
    }
}

impl ExtrusionModel {
    /// Filament length for `distance` mm of `bead`.
    pub fn length(&self, distance: f64, bead: Bead) -> f64 {
        extrusion_length(
            distance,
            bead.layer_height,
            bead.line_width,
            self.filament_diameter,
            self.multiplier,
        )
    }
}

/// Bead shape and velocity for one kind of stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bead {
    /// Extrusion width (mm).
    pub line_width: f64,
    /// Layer height (mm).
    pub layer_height: f64,
    /// Print velocity (mm/s).
    pub speed: f64,
}

impl Bead {
    /// Create a bead description.
    pub fn new(line_width: f64, layer_height: f64, speed: f64) -> Self {
        Self {
            line_width,
            layer_height,
            speed,
        }
    }

    /// Spacing between adjacent beads of this shape.
    pub fn spacing(&self) -> f64 {
        line_spacing(self.line_width, self.layer_height)
    }

    /// Same bead with a narrower or wider line.
    pub fn with_width(self, line_width: f64) -> Self {
        Self { line_width, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_spacing() {
        let s = line_spacing(0.45, 0.2);
        assert_relative_eq!(s, 0.45 - 0.2 * (1.0 - PI / 4.0), epsilon = 1e-12);
        assert!(s < 0.45);
    }

    #[test]
    fn test_extrusion_volume_balance() {
        let e = extrusion_length(100.0, 0.2, 0.45, 1.75, 1.0);
        let deposited = 100.0 * bead_area(0.45, 0.2);
        assert_relative_eq!(e * filament_area(1.75), deposited, epsilon = 1e-4);
    }

    #[test]
    fn test_extrusion_deterministic() {
        let a = extrusion_length(17.3, 0.25, 0.56, 1.75, 0.98);
        let b = extrusion_length(17.3, 0.25, 0.56, 1.75, 0.98);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(round_to(a, E_PLACES), a);
    }

    #[test]
    fn test_multiplier_scales() {
        let base = extrusion_length(50.0, 0.2, 0.45, 1.75, 1.0);
        let more = extrusion_length(50.0, 0.2, 0.45, 1.75, 1.1);
        assert!(more > base);
    }

    #[test]
    fn test_model_matches_free_function() {
        let model = ExtrusionModel::default();
        let bead = Bead::new(0.45, 0.2, 100.0);
        assert_eq!(
            model.length(10.0, bead),
            extrusion_length(10.0, 0.2, 0.45, 1.75, 0.98)
        );
    }
}
