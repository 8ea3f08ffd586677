//! Writing the generated program as text or binary G-code.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use fdmcal_bgcode::{write_atomic, Container, Metadata};
use fdmcal_toolpath::{Generated, MachineSettings};

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Plain G-code text.
    Ascii,
    /// Binary G-code container.
    Binary,
}

impl Format {
    /// Pick the format from the `--ascii` flag.
    pub fn from_ascii_flag(ascii: bool) -> Self {
        if ascii {
            Format::Ascii
        } else {
            Format::Binary
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Format::Ascii => "gcode",
            Format::Binary => "bgcode",
        }
    }
}

/// Metadata blocks for the binary container.
pub fn container(
    generated: &Generated,
    machine: &MachineSettings,
    printer_model: &str,
    calibration: &str,
) -> Container {
    let mut c = Container::new(generated.to_gcode());
    c.printer = Metadata::new()
        .with("printer_model", printer_model)
        .with("nozzle_diameter", machine.nozzle_diameter)
        .with("filament_diameter", machine.filament_diameter)
        .with("temperature", machine.hotend_temp)
        .with("bed_temperature", machine.bed_temp)
        .with("layer_height", machine.layer_height)
        .with("first_layer_height", machine.first_layer_height);
    c.print = Metadata::new()
        .with("generator", format!("fdmcal {}", env!("CARGO_PKG_VERSION")))
        .with("calibration", calibration)
        .with("layer_count", generated.layer_count)
        .with("max_layer_z", generated.max_layer_z)
        .with("filament used [mm]", generated.program.filament_used());
    c
}

/// Encode the program in `format`.
pub fn encode(format: Format, container: &Container) -> Result<Vec<u8>> {
    match format {
        Format::Ascii => Ok(container.gcode.clone().into_bytes()),
        Format::Binary => container
            .to_bytes()
            .context("failed to encode binary G-code"),
    }
}

/// Write `bytes` to `path`, or to stdout when `path` is `None`.
pub fn write(format: Format, bytes: &[u8], path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if path.extension().and_then(|e| e.to_str()) != Some(format.extension()) {
                warn!(
                    path = %path.display(),
                    "output extension does not match {} output (expected .{})",
                    if format == Format::Ascii { "plain" } else { "binary" },
                    format.extension()
                );
            }
            write_atomic(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "output written");
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(bytes).context("failed to write to stdout")?;
            out.flush().context("failed to flush stdout")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdmcal_bgcode::{BgcodeFile, BlockType};
    use fdmcal_toolpath::{
        Calibration, CalibrationProgram, PressureAdvanceSettings, Templates, TowerSettings,
    };

    fn generated() -> (Generated, MachineSettings) {
        let settings = PressureAdvanceSettings::default();
        let generated = settings
            .generate(&Templates::new("M83\n", "M84\n"))
            .unwrap();
        (generated, settings.machine)
    }

    #[test]
    fn test_binary_round_trip() {
        let (generated, machine) = generated();
        let c = container(&generated, &machine, "COREONE", "pressure-advance");
        let bytes = encode(Format::Binary, &c).unwrap();
        let file = BgcodeFile::parse(&bytes).unwrap();
        assert!(file.is_valid());
        assert_eq!(file.gcode().unwrap(), generated.to_gcode());
        let printer = file.metadata(BlockType::PrinterMetadata).unwrap().unwrap();
        assert_eq!(printer.get("printer_model"), Some("COREONE"));
        assert_eq!(printer.get("nozzle_diameter"), Some("0.4"));
        let print = file.metadata(BlockType::PrintMetadata).unwrap().unwrap();
        assert_eq!(print.get("calibration"), Some("pressure-advance"));
        assert_eq!(print.get("layer_count"), Some("4"));
    }

    #[test]
    fn test_tower_metadata_temperature() {
        let settings = TowerSettings {
            temp_start: 240,
            temp_end: 220,
            ..Default::default()
        };
        assert_ne!(settings.machine.hotend_temp, 240);
        let calibration = Calibration::from(settings);
        let generated = calibration
            .generate(&Templates::new("M83\n", "M84\n"))
            .unwrap();
        let c = container(
            &generated,
            &calibration.machine(),
            "COREONE",
            calibration.name(),
        );
        let file = BgcodeFile::parse(&encode(Format::Binary, &c).unwrap()).unwrap();
        let printer = file.metadata(BlockType::PrinterMetadata).unwrap().unwrap();
        assert_eq!(printer.get("temperature"), Some("240"));
    }

    #[test]
    fn test_ascii() {
        let (generated, machine) = generated();
        let c = container(&generated, &machine, "COREONE", "pressure-advance");
        let bytes = encode(Format::Ascii, &c).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), generated.to_gcode());
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pa.gcode");
        write(Format::Ascii, b"G28\n", Some(path.as_path())).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"G28\n");
    }
}
