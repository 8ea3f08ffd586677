#![warn(missing_docs)]

//! Toolpath synthesis for FDM calibration prints.
//!
//! This crate turns a resolved set of settings into an ordered G-code
//! command stream for two calibration families: pressure-advance V-corner
//! patterns and a segmented temperature tower. It performs no I/O; the
//! caller decides whether the result is written as text or packed into a
//! binary container.
//!
//! # Example
//!
//! ```ignore
//! use fdmcal_toolpath::{CalibrationProgram, PressureAdvanceSettings, Templates};
//!
//! let settings = PressureAdvanceSettings::default();
//! let templates = Templates::new(start_gcode, end_gcode);
//! let generated = settings.generate(&templates)?;
//!
//! for warning in &generated.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! std::fs::write("pa.gcode", generated.to_gcode())?;
//! ```

pub mod anchor;
pub mod calibration;
pub mod command;
pub mod config;
pub mod error;
pub mod extrusion;
pub mod label;
pub mod motion;
pub mod path;
pub mod pattern;
pub mod shapes;
pub mod template;
pub mod warning;

pub use anchor::AnchorMode;
pub use calibration::{
    Calibration, CalibrationProgram, Generated, PressureAdvancePlan, Templates, TowerLayout,
};
pub use command::{round_to, Command, Program};
pub use config::{MachineSettings, PressureAdvanceSettings, TowerSettings};
pub use error::{Result, ToolpathError};
pub use extrusion::{extrusion_length, line_spacing, Bead, ExtrusionModel};
pub use label::{draw_number, format_value, Glyph, Label, LabelStyle};
pub use motion::{Emitter, MotionSettings, MotionState, Position, RetractState};
pub use path::{BoundingBox, Point2, Polygon, Polyline};
pub use pattern::{AdvanceSweep, LayerRole, TemperatureSweep, TowerPlan, TowerSpec, VCornerSpec};
pub use template::{render, TemplateVars};
pub use warning::Warning;
