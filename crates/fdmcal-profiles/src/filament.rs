//! Filament presets.

use serde::Serialize;

use fdmcal_toolpath::MachineSettings;

/// Temperatures, cooling and retraction for one material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilamentPreset {
    /// Lookup key.
    pub key: &'static str,
    /// Hotend temperature (°C).
    pub hotend_temp: u32,
    /// Bed temperature (°C).
    pub bed_temp: u32,
    /// Part-cooling fan from layer 2 (%).
    pub fan_speed: u32,
    /// Part-cooling fan on the first layer (%).
    pub first_layer_fan: u32,
    /// Retraction distance (mm).
    pub retract_length: f64,
}

impl FilamentPreset {
    /// Copy the preset values into `machine`.
    pub fn apply(&self, machine: &mut MachineSettings) {
        machine.hotend_temp = self.hotend_temp;
        machine.bed_temp = self.bed_temp;
        machine.fan_speed = self.fan_speed;
        machine.first_layer_fan = self.first_layer_fan;
        machine.retract_length = self.retract_length;
    }
}

const fn filament(
    key: &'static str,
    hotend_temp: u32,
    bed_temp: u32,
    fan_speed: u32,
    retract_length: f64,
) -> FilamentPreset {
    FilamentPreset {
        key,
        hotend_temp,
        bed_temp,
        fan_speed,
        first_layer_fan: 0,
        retract_length,
    }
}

/// Built-in filament table.
pub const FILAMENTS: &[FilamentPreset] = &[
    filament("PLA", 215, 60, 100, 0.6),
    filament("PETG", 235, 85, 50, 0.8),
    filament("ABS", 245, 100, 0, 1.0),
    filament("ASA", 255, 100, 20, 1.0),
    filament("PA", 260, 90, 0, 1.0),
    filament("TPU", 230, 60, 50, 0.0),
    filament("PC", 275, 110, 0, 1.0),
];
