//! Command-line arguments and preset resolution.
//!
//! Every preset-backed value resolves as explicit flag, then preset, then
//! the built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use fdmcal_profiles::{builtin, Presets};
use fdmcal_toolpath::{
    AnchorMode, MachineSettings, PressureAdvanceSettings, Templates, TowerSettings,
};

#[derive(Parser, Debug)]
#[command(name = "fdmcal")]
#[command(about = "Calibration G-code generator for FDM printers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pressure-advance V-corner patterns
    #[command(name = "pressure-advance", alias = "pa")]
    PressureAdvance(PressureAdvanceArgs),
    /// Segmented temperature tower
    #[command(name = "temp-tower", alias = "tower")]
    TempTower(TowerArgs),
    /// List printer and filament presets
    Presets {
        /// Print the tables as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments shared by both calibrations.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Printer model; sets bed size and max Z
    #[arg(long, default_value = fdmcal_profiles::DEFAULT_PRINTER, value_name = "MODEL")]
    pub printer: String,
    /// Filament preset; sets temperatures, fan and retraction
    #[arg(long, value_name = "TYPE")]
    pub filament: Option<String>,

    /// Hotend temperature (default: filament preset, or 215)
    #[arg(long, value_name = "C")]
    pub hotend_temp: Option<u32>,
    /// Bed temperature (default: filament preset, or 60)
    #[arg(long, value_name = "C")]
    pub bed_temp: Option<u32>,

    /// Nozzle diameter
    #[arg(long, default_value_t = 0.4, value_name = "MM")]
    pub nozzle_dia: f64,
    /// Filament diameter
    #[arg(long, default_value_t = 1.75, value_name = "MM")]
    pub filament_dia: f64,
    /// Bed X size (default: printer preset)
    #[arg(long, value_name = "MM")]
    pub bed_x: Option<f64>,
    /// Bed Y size (default: printer preset)
    #[arg(long, value_name = "MM")]
    pub bed_y: Option<f64>,
    /// Maximum build height (default: printer preset)
    #[arg(long, value_name = "MM")]
    pub max_z: Option<f64>,

    /// First layer height
    #[arg(long, default_value_t = 0.25, value_name = "MM")]
    pub first_layer_height: f64,
    /// Layer height
    #[arg(long, default_value_t = 0.2, value_name = "MM")]
    pub layer_height: f64,

    /// Print speed
    #[arg(long, default_value_t = 100.0, value_name = "MM/S")]
    pub print_speed: f64,
    /// First layer speed
    #[arg(long, default_value_t = 30.0, value_name = "MM/S")]
    pub first_layer_speed: f64,
    /// Travel speed
    #[arg(long, default_value_t = 150.0, value_name = "MM/S")]
    pub travel_speed: f64,

    /// Line width as % of nozzle diameter
    #[arg(long, default_value_t = 112.5, value_name = "PCT")]
    pub line_width_pct: f64,
    /// Extrusion multiplier
    #[arg(long, default_value_t = 0.98, value_name = "RATIO")]
    pub extrusion_multiplier: f64,

    /// Retraction distance (default: filament preset, or 0.6)
    #[arg(long, value_name = "MM")]
    pub retract_dist: Option<f64>,
    /// Retraction speed
    #[arg(long, default_value_t = 45.0, value_name = "MM/S")]
    pub retract_speed: f64,
    /// Unretraction speed
    #[arg(long, default_value_t = 45.0, value_name = "MM/S")]
    pub unretract_speed: f64,
    /// Z-hop height; 0 disables
    #[arg(long, default_value_t = 0.1, value_name = "MM")]
    pub zhop: f64,

    /// First-layer anchor: frame, layer or none
    #[arg(long, default_value = "frame")]
    pub anchor: AnchorMode,
    /// Loops in a frame anchor
    #[arg(long, default_value_t = 4, value_name = "N")]
    pub anchor_perimeters: u32,

    /// Suppress M117 display messages
    #[arg(long)]
    pub no_lcd: bool,
    /// Fan speed from layer 2 (default: filament preset, or 100)
    #[arg(long, value_name = "PCT")]
    pub fan_speed: Option<u32>,
    /// First layer fan speed (default: filament preset, or 0)
    #[arg(long, value_name = "PCT")]
    pub first_layer_fan: Option<u32>,

    /// Custom start G-code template
    #[arg(long, value_name = "FILE")]
    pub start_gcode: Option<PathBuf>,
    /// Custom end G-code template
    #[arg(long, value_name = "FILE")]
    pub end_gcode: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Write plain G-code instead of binary G-code
    #[arg(long)]
    pub ascii: bool,
    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    pub dump_config: bool,
}

/// Pressure-advance arguments.
#[derive(Args, Debug, Clone)]
pub struct PressureAdvanceArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// First K value
    #[arg(long, default_value_t = 0.0, value_name = "K", allow_negative_numbers = true)]
    pub la_start: f64,
    /// Last K value
    #[arg(long, default_value_t = 4.0, value_name = "K", allow_negative_numbers = true)]
    pub la_end: f64,
    /// K increment per pattern
    #[arg(long, default_value_t = 1.0, value_name = "K", allow_negative_numbers = true)]
    pub la_step: f64,

    /// Pattern layers above the first layer
    #[arg(long, default_value_t = 4, value_name = "N")]
    pub layer_count: u32,
    /// Perimeters per pattern
    #[arg(long, default_value_t = 3, value_name = "N")]
    pub wall_count: u32,
    /// Length of each V arm
    #[arg(long, default_value_t = 20.0, value_name = "MM")]
    pub side_length: f64,
    /// Gap between patterns
    #[arg(long, default_value_t = 2.0, value_name = "MM")]
    pub pattern_spacing: f64,
    /// Angle of the V corner
    #[arg(long, default_value_t = 90.0, value_name = "DEG")]
    pub corner_angle: f64,

    /// Do not print K labels
    #[arg(long)]
    pub no_number_tab: bool,
    /// Drop the zero before the decimal point in labels
    #[arg(long)]
    pub no_leading_zeros: bool,
}

/// Temperature tower arguments.
#[derive(Args, Debug, Clone)]
pub struct TowerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Bottom segment temperature (default: hotend temp, filament preset, or 215)
    #[arg(long, value_name = "C")]
    pub temp_start: Option<i32>,
    /// Top segment temperature (default: temp-start - 30)
    #[arg(long, value_name = "C")]
    pub temp_end: Option<i32>,
    /// Temperature change per segment
    #[arg(long, default_value_t = 5.0, value_name = "C", allow_negative_numbers = true)]
    pub temp_step: f64,

    /// Height of one segment
    #[arg(long, default_value_t = 10.0, value_name = "MM")]
    pub module_height: f64,
    /// Depth of the tower
    #[arg(long, default_value_t = 10.0, value_name = "MM")]
    pub module_depth: f64,
    /// Width of the bridge gap
    #[arg(long, default_value_t = 30.0, value_name = "MM")]
    pub bridge_length: f64,
    /// Thickness of the bridge slab
    #[arg(long, default_value_t = 1.0, value_name = "MM")]
    pub bridge_thick: f64,
    /// Short overhang angle from horizontal
    #[arg(long, default_value_t = 45.0, value_name = "DEG")]
    pub short_angle: f64,
    /// Long overhang angle from horizontal
    #[arg(long, default_value_t = 35.0, value_name = "DEG")]
    pub long_angle: f64,
    /// Stringing cones per segment
    #[arg(long, default_value_t = 2, value_name = "N")]
    pub n_cones: u32,
    /// Solid base thickness
    #[arg(long, default_value_t = 1.0, value_name = "MM")]
    pub base_thick: f64,

    /// Do not print temperature labels
    #[arg(long)]
    pub no_label_tab: bool,
}

impl CommonArgs {
    /// Resolve the machine settings against the presets.
    pub fn machine(&self, presets: &Presets) -> Result<MachineSettings> {
        let printer = presets.printer(&self.printer).ok_or_else(|| {
            anyhow!(
                "unknown printer '{}' (choices: {})",
                self.printer,
                presets.printer_keys()
            )
        })?;
        let filament = self
            .filament
            .as_deref()
            .map(|key| {
                presets.filament(key).ok_or_else(|| {
                    anyhow!(
                        "unknown filament '{key}' (choices: {})",
                        presets.filament_keys()
                    )
                })
            })
            .transpose()?;

        let mut machine = MachineSettings::default();
        printer.apply(&mut machine);
        info!(
            printer = printer.key,
            bed_x = printer.bed_x,
            bed_y = printer.bed_y,
            max_z = printer.max_z,
            "printer preset"
        );
        if let Some(filament) = filament {
            filament.apply(&mut machine);
            info!(
                filament = filament.key,
                hotend = filament.hotend_temp,
                bed = filament.bed_temp,
                fan = filament.fan_speed,
                retract = filament.retract_length,
                "filament preset"
            );
        }

        if let Some(v) = self.bed_x {
            machine.bed_x = v;
        }
        if let Some(v) = self.bed_y {
            machine.bed_y = v;
        }
        if let Some(v) = self.max_z {
            machine.max_z = v;
        }
        if let Some(v) = self.hotend_temp {
            machine.hotend_temp = v;
        }
        if let Some(v) = self.bed_temp {
            machine.bed_temp = v;
        }
        if let Some(v) = self.retract_dist {
            machine.retract_length = v;
        }
        if let Some(v) = self.fan_speed {
            machine.fan_speed = v;
        }
        if let Some(v) = self.first_layer_fan {
            machine.first_layer_fan = v;
        }

        machine.nozzle_diameter = self.nozzle_dia;
        machine.filament_diameter = self.filament_dia;
        machine.first_layer_height = self.first_layer_height;
        machine.layer_height = self.layer_height;
        machine.print_speed = self.print_speed;
        machine.first_layer_speed = self.first_layer_speed;
        machine.travel_speed = self.travel_speed;
        machine.line_width_pct = self.line_width_pct;
        machine.extrusion_multiplier = self.extrusion_multiplier;
        machine.retract_speed = self.retract_speed;
        machine.unretract_speed = self.unretract_speed;
        machine.zhop = self.zhop;
        machine.anchor = self.anchor;
        machine.anchor_perimeters = self.anchor_perimeters;
        machine.show_lcd = !self.no_lcd;
        Ok(machine)
    }

    /// Load the start and end templates: explicit file, else built-in.
    pub fn templates(&self) -> Result<Templates> {
        let fallback = builtin(&self.printer);
        let start = match &self.start_gcode {
            Some(path) => Some(read_template(path)?),
            None => None,
        };
        let end = match &self.end_gcode {
            Some(path) => Some(read_template(path)?),
            None => None,
        };

        if fallback.fallback && (start.is_none() || end.is_none()) {
            let missing: Vec<&str> = [("start-gcode", &start), ("end-gcode", &end)]
                .into_iter()
                .filter(|(_, t)| t.is_none())
                .map(|(name, _)| name)
                .collect();
            warn!(
                "no {} for {}; falling back to the built-in Core One template",
                missing.join(" or "),
                self.printer.to_uppercase()
            );
        }

        Ok(Templates {
            start: start.unwrap_or(fallback.templates.start),
            end: end.unwrap_or(fallback.templates.end),
        })
    }
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read template {}", path.display()))
}

impl PressureAdvanceArgs {
    /// Fully resolved settings.
    pub fn settings(&self, presets: &Presets) -> Result<PressureAdvanceSettings> {
        Ok(PressureAdvanceSettings {
            machine: self.common.machine(presets)?,
            la_start: self.la_start,
            la_end: self.la_end,
            la_step: self.la_step,
            layer_count: self.layer_count,
            wall_count: self.wall_count,
            side_length: self.side_length,
            pattern_spacing: self.pattern_spacing,
            corner_angle: self.corner_angle,
            number_tab: !self.no_number_tab,
            no_leading_zeros: self.no_leading_zeros,
        })
    }
}

impl TowerArgs {
    /// Fully resolved settings.
    ///
    /// The first segment temperature doubles as the hotend temperature.
    pub fn settings(&self, presets: &Presets) -> Result<TowerSettings> {
        let mut machine = self.common.machine(presets)?;
        let temp_start = self
            .temp_start
            .unwrap_or(i32::try_from(machine.hotend_temp).context("hotend temperature")?);
        let temp_end = self.temp_end.unwrap_or(temp_start - 30);
        if temp_start <= 0 {
            return Err(anyhow!("temp-start must be positive, got {temp_start}"));
        }
        machine.hotend_temp = temp_start.unsigned_abs();

        let mut settings = TowerSettings {
            machine,
            temp_start,
            temp_end,
            temp_step: self.temp_step,
            label_tab: !self.no_label_tab,
            ..Default::default()
        };
        settings.tower.module_height = self.module_height;
        settings.tower.module_depth = self.module_depth;
        settings.tower.bridge_length = self.bridge_length;
        settings.tower.bridge_thick = self.bridge_thick;
        settings.tower.short_angle = self.short_angle;
        settings.tower.long_angle = self.long_angle;
        settings.tower.n_cones = self.n_cones;
        settings.tower.base_thick = self.base_thick;
        Ok(settings)
    }
}
