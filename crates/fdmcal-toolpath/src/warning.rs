//! Non-fatal diagnostics raised during generation.
//!
//! Warnings never enter the command stream. They are returned with the
//! generated program and logged through `tracing`.

use std::fmt;

/// A condition the caller should know about; generation still completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The footprint does not fit on the bed.
    BedOverflow {
        /// Footprint width (mm).
        width: f64,
        /// Footprint depth (mm).
        height: f64,
        /// Bed width (mm).
        bed_x: f64,
        /// Bed depth (mm).
        bed_y: f64,
        /// Largest whole side length that fits, for V-corner patterns.
        suggested_side_length: Option<u32>,
    },
    /// The top layer is above the printer's maximum Z.
    HeightOverflow {
        /// Highest layer Z (mm).
        height: f64,
        /// Printer limit (mm).
        max_z: f64,
    },
    /// The temperature span is not a multiple of the step.
    UnevenTemperatureStep {
        /// Span between start and end (°C).
        span: i32,
        /// Requested step (°C).
        step: f64,
        /// Size of the final, shorter step (°C).
        last_step: i32,
        /// Temperature of the extra final segment (°C).
        end: i32,
    },
}

impl Warning {
    /// Emit through `tracing` at warn level.
    pub fn log(&self) {
        tracing::warn!("{self}");
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BedOverflow {
                width,
                height,
                bed_x,
                bed_y,
                suggested_side_length,
            } => {
                write!(
                    f,
                    "footprint {width:.1}x{height:.1} mm exceeds bed {bed_x}x{bed_y} mm"
                )?;
                match suggested_side_length {
                    Some(l) => write!(
                        f,
                        "; use --side-length {l} (or a larger step / narrower range)"
                    ),
                    None => Ok(()),
                }
            }
            Warning::HeightOverflow { height, max_z } => {
                write!(f, "top layer at {height} mm exceeds max Z {max_z} mm")
            }
            Warning::UnevenTemperatureStep {
                span,
                step,
                last_step,
                end,
            } => write!(
                f,
                "span {span} C is not a multiple of step {step} C; \
                 last segment step is {last_step} C (ends at {end} C)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let w = Warning::BedOverflow {
            width: 260.04,
            height: 40.0,
            bed_x: 250.0,
            bed_y: 220.0,
            suggested_side_length: Some(18),
        };
        let text = w.to_string();
        assert!(text.starts_with("footprint 260.0x40.0 mm exceeds bed 250x220 mm"));
        assert!(text.contains("--side-length 18"));

        let h = Warning::HeightOverflow {
            height: 300.2,
            max_z: 270.0,
        };
        assert_eq!(h.to_string(), "top layer at 300.2 mm exceeds max Z 270 mm");
    }
}
