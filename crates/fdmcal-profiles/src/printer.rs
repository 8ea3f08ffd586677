//! Printer presets.

use serde::Serialize;

use fdmcal_toolpath::MachineSettings;

/// Build volume and model string of a supported printer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrinterPreset {
    /// Lookup key.
    pub key: &'static str,
    /// Bed size X (mm).
    pub bed_x: f64,
    /// Bed size Y (mm).
    pub bed_y: f64,
    /// Maximum build height (mm).
    pub max_z: f64,
    /// Model string expected by the firmware model check.
    pub model: &'static str,
}

impl PrinterPreset {
    /// Copy the build volume into `machine`.
    pub fn apply(&self, machine: &mut MachineSettings) {
        machine.bed_x = self.bed_x;
        machine.bed_y = self.bed_y;
        machine.max_z = self.max_z;
    }
}

/// Key of the default printer.
pub const DEFAULT_PRINTER: &str = "COREONE";

/// Built-in printer table.
pub const PRINTERS: &[PrinterPreset] = &[
    PrinterPreset {
        key: "MINI",
        bed_x: 180.0,
        bed_y: 180.0,
        max_z: 180.0,
        model: "MINI",
    },
    PrinterPreset {
        key: "MK4S",
        bed_x: 250.0,
        bed_y: 210.0,
        max_z: 220.0,
        model: "MK4S",
    },
    PrinterPreset {
        key: "COREONE",
        bed_x: 250.0,
        bed_y: 220.0,
        max_z: 270.0,
        model: "COREONE",
    },
    PrinterPreset {
        key: "COREONEL",
        bed_x: 300.0,
        bed_y: 300.0,
        max_z: 330.0,
        model: "COREONEL",
    },
    PrinterPreset {
        key: "XL",
        bed_x: 360.0,
        bed_y: 360.0,
        max_z: 360.0,
        model: "XL",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_machine_defaults() {
        let preset = PRINTERS.iter().find(|p| p.key == DEFAULT_PRINTER).unwrap();
        let defaults = MachineSettings::default();
        let mut machine = MachineSettings {
            bed_x: 1.0,
            bed_y: 1.0,
            max_z: 1.0,
            ..Default::default()
        };
        preset.apply(&mut machine);
        assert_eq!(machine, defaults);
    }

    #[test]
    fn test_apply_only_build_volume() {
        let mini = PRINTERS[0];
        let mut machine = MachineSettings::default();
        mini.apply(&mut machine);
        assert_eq!((machine.bed_x, machine.bed_y, machine.max_z), (180.0, 180.0, 180.0));
        assert_eq!(machine.hotend_temp, MachineSettings::default().hotend_temp);
    }
}
