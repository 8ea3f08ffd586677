//! fdmcal CLI - calibration G-code generator
//!
//! Generates pressure-advance patterns and temperature towers as plain or
//! binary G-code.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use fdmcal_profiles::Presets;
use fdmcal_toolpath::{Calibration, CalibrationProgram, Templates};

mod args;
mod output;

use args::{Cli, Commands, CommonArgs};
use output::Format;

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let presets = Presets::builtin();

    match cli.command {
        Commands::PressureAdvance(a) => {
            let settings = a.settings(&presets)?;
            run(&a.common, &presets, settings.into())?;
        }
        Commands::TempTower(a) => {
            let settings = a.settings(&presets)?;
            run(&a.common, &presets, settings.into())?;
        }
        Commands::Presets { json } => list_presets(&presets, json)?,
    }

    Ok(())
}

/// Logs go to stderr so G-code on stdout stays clean.
fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[derive(Serialize)]
struct ConfigDump<'a> {
    calibration: &'a str,
    settings: &'a Calibration,
    start_gcode: &'a str,
    end_gcode: &'a str,
}

fn run(common: &CommonArgs, presets: &Presets, calibration: Calibration) -> Result<()> {
    let templates = common.templates()?;

    if common.dump_config {
        let dump = ConfigDump {
            calibration: calibration.name(),
            settings: &calibration,
            start_gcode: &templates.start,
            end_gcode: &templates.end,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&dump).context("failed to serialize settings")?
        );
        return Ok(());
    }

    let generated = generate(&calibration, &templates)?;
    let machine = calibration.machine();
    let model = presets
        .printer(&common.printer)
        .map_or(common.printer.as_str(), |p| p.model);
    let container = output::container(&generated, &machine, model, calibration.name());

    let format = Format::from_ascii_flag(common.ascii);
    let bytes = output::encode(format, &container)?;
    output::write(format, &bytes, common.output.as_deref())?;
    Ok(())
}

fn generate(
    calibration: &Calibration,
    templates: &Templates,
) -> Result<fdmcal_toolpath::Generated> {
    let generated = calibration
        .generate(templates)
        .with_context(|| format!("{} generation failed", calibration.name()))?;
    info!(
        calibration = calibration.name(),
        layers = generated.layer_count,
        max_z = generated.max_layer_z,
        lines = generated.program.len(),
        warnings = generated.warnings.len(),
        "generated"
    );
    Ok(generated)
}

fn list_presets(presets: &Presets, json: bool) -> Result<()> {
    if json {
        let tables = serde_json::json!({
            "printers": presets.printers(),
            "filaments": presets.filaments(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&tables).context("failed to serialize presets")?
        );
        return Ok(());
    }

    println!("Printers:");
    for p in presets.printers() {
        println!(
            "  {:<10} bed {:.0}x{:.0} mm  max Z {:.0} mm",
            p.key, p.bed_x, p.bed_y, p.max_z
        );
    }
    println!("Filaments:");
    for f in presets.filaments() {
        println!(
            "  {:<10} hotend {} C  bed {} C  fan {} %  retract {} mm",
            f.key, f.hotend_temp, f.bed_temp, f.fan_speed, f.retract_length
        );
    }
    Ok(())
}
