//! First-layer anchors printed around a calibration footprint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ToolpathError;
use crate::extrusion::Bead;
use crate::motion::Emitter;
use crate::path::Point2;
use crate::shapes::{concentric_rectangles, SolidRect};

/// Perimeter loops used by the filled anchor.
pub const LAYER_ANCHOR_PERIMETERS: usize = 2;

/// Margin around the footprint when no anchor is printed (mm).
pub const BARE_MARGIN: f64 = 2.0;

/// Adhesion aid printed on the first layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Concentric perimeter loops.
    #[default]
    Frame,
    /// Two loops plus a solid fill.
    Layer,
    /// Nothing.
    None,
}

impl AnchorMode {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorMode::Frame => "frame",
            AnchorMode::Layer => "layer",
            AnchorMode::None => "none",
        }
    }

    /// Distance from the footprint edge to the pattern area.
    ///
    /// `clearance` is added beyond the anchor loops; without an anchor a
    /// fixed [`BARE_MARGIN`] is used.
    pub fn margin(self, perimeters: u32, spacing: f64, clearance: f64) -> f64 {
        match self {
            AnchorMode::None => BARE_MARGIN,
            AnchorMode::Frame | AnchorMode::Layer => perimeters as f64 * spacing + clearance,
        }
    }

    /// Print the anchor over the rectangle `min .. min + (width, height)`.
    pub fn render(
        self,
        em: &mut Emitter,
        min: Point2,
        width: f64,
        height: f64,
        perimeters: u32,
        bead: Bead,
    ) {
        match self {
            AnchorMode::Frame => {
                em.comment("Anchor frame");
                let loops =
                    concentric_rectangles(min, width, height, bead.spacing(), perimeters as usize);
                for polygon in &loops {
                    em.trace_loop(polygon, bead);
                }
            }
            AnchorMode::Layer => {
                em.comment("Anchor layer (filled)");
                SolidRect::new(min, width, height, bead.spacing(), LAYER_ANCHOR_PERIMETERS)
                    .emit(em, bead);
            }
            AnchorMode::None => {}
        }
    }
}

impl fmt::Display for AnchorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorMode {
    type Err = ToolpathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frame" => Ok(AnchorMode::Frame),
            "layer" => Ok(AnchorMode::Layer),
            "none" => Ok(AnchorMode::None),
            other => Err(ToolpathError::InvalidSettings(format!(
                "unknown anchor mode '{other}' (expected frame, layer or none)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::extrusion::ExtrusionModel;
    use crate::motion::MotionSettings;

    fn emitter() -> Emitter {
        Emitter::new(MotionSettings::default(), ExtrusionModel::default())
    }

    fn draws(em: &Emitter) -> usize {
        em.program()
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Linear { x: Some(_), .. }))
            .count()
    }

    #[test]
    fn test_parse() {
        assert_eq!("frame".parse::<AnchorMode>().unwrap(), AnchorMode::Frame);
        assert_eq!("LAYER".parse::<AnchorMode>().unwrap(), AnchorMode::Layer);
        assert_eq!("none".parse::<AnchorMode>().unwrap(), AnchorMode::None);
        assert!("brim".parse::<AnchorMode>().is_err());
    }

    #[test]
    fn test_margin() {
        assert_eq!(AnchorMode::None.margin(4, 0.5, 2.0), BARE_MARGIN);
        assert_eq!(AnchorMode::Frame.margin(4, 0.5, 2.0), 4.0);
    }

    #[test]
    fn test_frame_loops() {
        let mut em = emitter();
        let bead = Bead::new(0.56, 0.25, 30.0);
        AnchorMode::Frame.render(&mut em, Point2::new(10.0, 10.0), 40.0, 20.0, 4, bead);
        // four sides per loop
        assert_eq!(draws(&em), 16);
    }

    #[test]
    fn test_none_is_silent() {
        let mut em = emitter();
        let bead = Bead::new(0.56, 0.25, 30.0);
        AnchorMode::None.render(&mut em, Point2::new(10.0, 10.0), 40.0, 20.0, 4, bead);
        assert!(em.program().is_empty());
    }

    #[test]
    fn test_layer_fills() {
        let mut em = emitter();
        let bead = Bead::new(0.56, 0.25, 30.0);
        AnchorMode::Layer.render(&mut em, Point2::new(10.0, 10.0), 40.0, 20.0, 4, bead);
        assert!(draws(&em) > 8 + 20);
    }
}
