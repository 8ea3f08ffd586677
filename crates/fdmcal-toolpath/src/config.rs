//! Resolved generation settings.
//!
//! These structs are the whole input boundary of the crate: the caller
//! resolves presets and flags, then hands over plain values. Each has a
//! `validate()` that runs before any geometry is produced.

use serde::{Deserialize, Serialize};

use crate::anchor::AnchorMode;
use crate::error::{Result, ToolpathError};
use crate::extrusion::{line_spacing, Bead, ExtrusionModel};
use crate::motion::MotionSettings;
use crate::pattern::{AdvanceSweep, TemperatureSweep, TowerSpec, VCornerSpec};

fn positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ToolpathError::InvalidSettings(format!(
            "{name} must be positive"
        )))
    }
}

/// Printer, material and motion settings shared by both calibrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSettings {
    /// Bed width (mm).
    pub bed_x: f64,
    /// Bed depth (mm).
    pub bed_y: f64,
    /// Maximum print height (mm).
    pub max_z: f64,
    /// Nozzle diameter (mm).
    pub nozzle_diameter: f64,
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Bed temperature (°C).
    pub bed_temp: u32,
    /// Hotend temperature (°C).
    pub hotend_temp: u32,
    /// First layer height (mm).
    pub first_layer_height: f64,
    /// Layer height for the remaining layers (mm).
    pub layer_height: f64,
    /// Print velocity (mm/s).
    pub print_speed: f64,
    /// First layer velocity (mm/s).
    pub first_layer_speed: f64,
    /// Travel velocity (mm/s).
    pub travel_speed: f64,
    /// Line width as a percentage of the nozzle diameter.
    pub line_width_pct: f64,
    /// Anchor line width as a percentage of the nozzle diameter.
    pub anchor_line_width_pct: f64,
    /// Flow multiplier.
    pub extrusion_multiplier: f64,
    /// Retraction length (mm).
    pub retract_length: f64,
    /// Retraction velocity (mm/s).
    pub retract_speed: f64,
    /// Prime velocity (mm/s).
    pub unretract_speed: f64,
    /// Z-hop height (mm), 0 disables.
    pub zhop: f64,
    /// First layer anchor.
    pub anchor: AnchorMode,
    /// Loops in a frame anchor.
    pub anchor_perimeters: u32,
    /// Show values on the printer display.
    pub show_lcd: bool,
    /// Part-cooling fan from layer 2 (%).
    pub fan_speed: u32,
    /// Part-cooling fan on the first layer (%).
    pub first_layer_fan: u32,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            bed_x: 250.0,
            bed_y: 220.0,
            max_z: 270.0,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            bed_temp: 60,
            hotend_temp: 215,
            first_layer_height: 0.25,
            layer_height: 0.2,
            print_speed: 100.0,
            first_layer_speed: 30.0,
            travel_speed: 150.0,
            line_width_pct: 112.5,
            anchor_line_width_pct: 140.0,
            extrusion_multiplier: 0.98,
            retract_length: 0.6,
            retract_speed: 45.0,
            unretract_speed: 45.0,
            zhop: 0.1,
            anchor: AnchorMode::Frame,
            anchor_perimeters: 4,
            show_lcd: true,
            fan_speed: 100,
            first_layer_fan: 0,
        }
    }
}

impl MachineSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        positive("bed_x", self.bed_x)?;
        positive("bed_y", self.bed_y)?;
        positive("max_z", self.max_z)?;
        positive("nozzle_diameter", self.nozzle_diameter)?;
        positive("filament_diameter", self.filament_diameter)?;
        positive("first_layer_height", self.first_layer_height)?;
        positive("layer_height", self.layer_height)?;
        positive("print_speed", self.print_speed)?;
        positive("first_layer_speed", self.first_layer_speed)?;
        positive("travel_speed", self.travel_speed)?;
        positive("line_width_pct", self.line_width_pct)?;
        positive("anchor_line_width_pct", self.anchor_line_width_pct)?;
        positive("extrusion_multiplier", self.extrusion_multiplier)?;

        if self.layer_height >= self.line_width() || self.first_layer_height >= self.line_width()
        {
            return Err(ToolpathError::InvalidSettings(
                "layer heights must be smaller than the line width".into(),
            ));
        }
        if self.first_layer_height >= self.anchor_line_width() {
            return Err(ToolpathError::InvalidSettings(
                "first_layer_height must be smaller than the anchor line width".into(),
            ));
        }
        if self.retract_length < 0.0 || self.zhop < 0.0 {
            return Err(ToolpathError::InvalidSettings(
                "retract_length and zhop must not be negative".into(),
            ));
        }
        if self.retract_length > 0.0 {
            positive("retract_speed", self.retract_speed)?;
            positive("unretract_speed", self.unretract_speed)?;
        }
        if self.fan_speed > 100 || self.first_layer_fan > 100 {
            return Err(ToolpathError::InvalidSettings(
                "fan speeds must be between 0 and 100 %".into(),
            ));
        }
        if self.anchor == AnchorMode::Frame && self.anchor_perimeters == 0 {
            return Err(ToolpathError::InvalidSettings(
                "anchor_perimeters must be at least 1 for a frame anchor".into(),
            ));
        }
        Ok(())
    }

    /// Normal extrusion width (mm).
    pub fn line_width(&self) -> f64 {
        self.nozzle_diameter * self.line_width_pct / 100.0
    }

    /// Anchor extrusion width (mm).
    pub fn anchor_line_width(&self) -> f64 {
        self.nozzle_diameter * self.anchor_line_width_pct / 100.0
    }

    /// Spacing between anchor loops on the first layer.
    pub fn anchor_spacing(&self) -> f64 {
        line_spacing(self.anchor_line_width(), self.first_layer_height)
    }

    /// Retraction and travel parameters.
    pub fn motion(&self) -> MotionSettings {
        MotionSettings {
            retract_length: self.retract_length,
            retract_speed: self.retract_speed,
            unretract_speed: self.unretract_speed,
            zhop: self.zhop,
            travel_speed: self.travel_speed,
        }
    }

    /// Filament model.
    pub fn extrusion(&self) -> ExtrusionModel {
        ExtrusionModel {
            filament_diameter: self.filament_diameter,
            multiplier: self.extrusion_multiplier,
        }
    }

    /// Normal bead on the first layer.
    pub fn first_layer_bead(&self) -> Bead {
        Bead::new(self.line_width(), self.first_layer_height, self.first_layer_speed)
    }

    /// Anchor bead on the first layer.
    pub fn anchor_bead(&self) -> Bead {
        Bead::new(
            self.anchor_line_width(),
            self.first_layer_height,
            self.first_layer_speed,
        )
    }

    /// Normal bead above the first layer.
    pub fn layer_bead(&self) -> Bead {
        Bead::new(self.line_width(), self.layer_height, self.print_speed)
    }

    /// Z of global layer `index` (0 is the first layer).
    pub fn layer_z(&self, index: usize) -> f64 {
        self.first_layer_height + index as f64 * self.layer_height
    }
}

/// Pressure-advance pattern settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureAdvanceSettings {
    /// Shared machine settings.
    pub machine: MachineSettings,
    /// First K value.
    pub la_start: f64,
    /// Last K value.
    pub la_end: f64,
    /// K increment per pattern.
    pub la_step: f64,
    /// Printed layers, including the first.
    pub layer_count: u32,
    /// Nested walls per pattern.
    pub wall_count: u32,
    /// Leg length (mm).
    pub side_length: f64,
    /// Gap between patterns (mm).
    pub pattern_spacing: f64,
    /// Apex angle (degrees).
    pub corner_angle: f64,
    /// Print value labels under the patterns.
    pub number_tab: bool,
    /// Print `0.05` as `.05`.
    pub no_leading_zeros: bool,
}

impl Default for PressureAdvanceSettings {
    fn default() -> Self {
        Self {
            machine: MachineSettings::default(),
            la_start: 0.0,
            la_end: 4.0,
            la_step: 1.0,
            layer_count: 4,
            wall_count: 3,
            side_length: 20.0,
            pattern_spacing: 2.0,
            corner_angle: 90.0,
            number_tab: true,
            no_leading_zeros: false,
        }
    }
}

impl PressureAdvanceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        self.machine.validate()?;
        self.sweep().validate()?;
        self.pattern().validate()?;
        if self.layer_count < 1 {
            return Err(ToolpathError::InvalidSettings(
                "layer_count must be at least 1".into(),
            ));
        }
        if self.pattern_spacing < 0.0 {
            return Err(ToolpathError::InvalidSettings(
                "pattern_spacing must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// The K sweep.
    pub fn sweep(&self) -> AdvanceSweep {
        AdvanceSweep {
            start: self.la_start,
            end: self.la_end,
            step: self.la_step,
        }
    }

    /// One pattern's geometry, spaced for the normal layer height.
    pub fn pattern(&self) -> VCornerSpec {
        VCornerSpec {
            side_length: self.side_length,
            wall_count: self.wall_count,
            corner_angle: self.corner_angle,
            spacing: line_spacing(self.machine.line_width(), self.machine.layer_height),
        }
    }
}

/// Temperature tower settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSettings {
    /// Shared machine settings.
    pub machine: MachineSettings,
    /// Bottom segment temperature (°C).
    pub temp_start: i32,
    /// Top segment temperature (°C).
    pub temp_end: i32,
    /// Step between segments (°C).
    pub temp_step: f64,
    /// Module geometry.
    pub tower: TowerSpec,
    /// Print the temperature on each slab.
    pub label_tab: bool,
}

impl Default for TowerSettings {
    fn default() -> Self {
        Self {
            machine: MachineSettings::default(),
            temp_start: 215,
            temp_end: 185,
            temp_step: 5.0,
            tower: TowerSpec::default(),
            label_tab: true,
        }
    }
}

impl TowerSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        self.machine.validate()?;
        self.sweep().validate()?;
        self.tower.validate()?;
        for t in [self.temp_start, self.temp_end] {
            if !(0..=500).contains(&t) {
                return Err(ToolpathError::InvalidSettings(format!(
                    "temperature {t} C is out of range"
                )));
            }
        }
        Ok(())
    }

    /// The temperature sweep.
    pub fn sweep(&self) -> TemperatureSweep {
        TemperatureSweep {
            start: self.temp_start,
            end: self.temp_end,
            step: self.temp_step,
        }
    }

    /// Machine settings as printed: the hotend starts at the bottom segment.
    pub fn print_machine(&self) -> MachineSettings {
        MachineSettings {
            hotend_temp: self.temp_start.max(0) as u32,
            ..self.machine.clone()
        }
    }
}
