//! Calibration program generators.
//!
//! Both families implement [`CalibrationProgram`]; [`Calibration`] is the
//! closed set a caller can pick from.

pub mod pressure_advance;
pub mod temperature_tower;

pub use pressure_advance::PressureAdvancePlan;
pub use temperature_tower::TowerLayout;

use serde::{Deserialize, Serialize};

use crate::command::{Command, Program};
use crate::config::{MachineSettings, PressureAdvanceSettings, TowerSettings};
use crate::error::Result;
use crate::motion::Emitter;
use crate::path::BoundingBox;
use crate::template::{render, TemplateVars};
use crate::warning::Warning;

/// Start and end G-code templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Templates {
    /// Printed before the first layer.
    pub start: String,
    /// Printed after the last layer.
    pub end: String,
}

impl Templates {
    /// Create from start and end text.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A finished calibration program.
#[derive(Debug, Clone)]
pub struct Generated {
    /// The command stream.
    pub program: Program,
    /// Non-fatal diagnostics, in the order they were found.
    pub warnings: Vec<Warning>,
    /// Number of printed layers.
    pub layer_count: usize,
    /// Z of the highest layer (mm).
    pub max_layer_z: f64,
    /// Occupied bed area, anchor included.
    pub footprint: BoundingBox,
}

impl Generated {
    /// Newline-terminated G-code text.
    pub fn to_gcode(&self) -> String {
        self.program.to_gcode()
    }
}

/// Shared interface of the calibration families.
pub trait CalibrationProgram {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check settings before any geometry is produced.
    fn validate(&self) -> Result<()>;

    /// Build the full program.
    fn generate(&self, templates: &Templates) -> Result<Generated>;
}

/// One of the supported calibrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Calibration {
    /// Pressure-advance V-corner patterns.
    PressureAdvance(PressureAdvanceSettings),
    /// Segmented temperature tower.
    TemperatureTower(TowerSettings),
}

impl Calibration {
    /// Machine settings the program is printed with.
    pub fn machine(&self) -> MachineSettings {
        match self {
            Calibration::PressureAdvance(s) => s.machine.clone(),
            Calibration::TemperatureTower(s) => s.print_machine(),
        }
    }
}

impl CalibrationProgram for Calibration {
    fn name(&self) -> &'static str {
        match self {
            Calibration::PressureAdvance(s) => s.name(),
            Calibration::TemperatureTower(s) => s.name(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Calibration::PressureAdvance(s) => CalibrationProgram::validate(s),
            Calibration::TemperatureTower(s) => CalibrationProgram::validate(s),
        }
    }

    fn generate(&self, templates: &Templates) -> Result<Generated> {
        match self {
            Calibration::PressureAdvance(s) => s.generate(templates),
            Calibration::TemperatureTower(s) => s.generate(templates),
        }
    }
}

impl From<PressureAdvanceSettings> for Calibration {
    fn from(settings: PressureAdvanceSettings) -> Self {
        Calibration::PressureAdvance(settings)
    }
}

impl From<TowerSettings> for Calibration {
    fn from(settings: TowerSettings) -> Self {
        Calibration::TemperatureTower(settings)
    }
}

const RULE: &str = "============================================================";

fn section(em: &mut Emitter, title: &str) {
    em.comment(format!("--- {title} ---"));
}

fn header(em: &mut Emitter, title: &str, lines: &[String]) {
    em.comment(RULE);
    em.comment(title);
    em.comment(RULE);
    for line in lines {
        em.comment(line.as_str());
    }
    em.blank();
}

fn emit_template(em: &mut Emitter, title: &str, template: &str, vars: &TemplateVars) {
    section(em, title);
    em.raw_block(&render(template, vars));
    em.blank();
}

fn bed_overflow(
    machine: &MachineSettings,
    footprint: &BoundingBox,
    suggested_side_length: Option<u32>,
) -> Option<Warning> {
    if footprint.width() > machine.bed_x || footprint.height() > machine.bed_y {
        Some(Warning::BedOverflow {
            width: footprint.width(),
            height: footprint.height(),
            bed_x: machine.bed_x,
            bed_y: machine.bed_y,
            suggested_side_length,
        })
    } else {
        None
    }
}

fn height_overflow(machine: &MachineSettings, max_layer_z: f64) -> Option<Warning> {
    (max_layer_z > machine.max_z).then_some(Warning::HeightOverflow {
        height: max_layer_z,
        max_z: machine.max_z,
    })
}

fn fan(em: &mut Emitter, percent: u32) {
    em.push(Command::Fan { percent });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        let pa = Calibration::from(PressureAdvanceSettings::default());
        assert_eq!(pa.name(), "pressure-advance");
        let tower = Calibration::from(TowerSettings::default());
        assert_eq!(tower.name(), "temperature-tower");
        assert!(tower.validate().is_ok());

        let templates = Templates::new("M83", "M84");
        let generated = pa.generate(&templates).unwrap();
        let text = generated.to_gcode();
        assert!(text.contains("\nM83\n"));
        assert!(text.contains("\nM84\n"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_serde_tag() {
        let tower = Calibration::from(TowerSettings::default());
        let json = serde_json::to_value(&tower).unwrap();
        assert_eq!(json["kind"], "temperature-tower");
        assert_eq!(json["temp_start"], 215);
        let back: Calibration = serde_json::from_value(json).unwrap();
        assert_eq!(back, tower);
    }

    #[test]
    fn test_machine_as_printed() {
        let tower = Calibration::from(TowerSettings {
            machine: MachineSettings {
                hotend_temp: 250,
                ..Default::default()
            },
            temp_start: 230,
            temp_end: 210,
            ..Default::default()
        });
        assert_eq!(tower.machine().hotend_temp, 230);
        let text = tower
            .generate(&Templates::new("M104 S{hotend_temp}", "M84"))
            .unwrap()
            .to_gcode();
        assert!(text.contains("\nM104 S230\n"));

        let pa = PressureAdvanceSettings::default();
        let hotend = pa.machine.hotend_temp;
        assert_eq!(Calibration::from(pa).machine().hotend_temp, hotend);
    }
}
