#![warn(missing_docs)]

//! Printer and filament presets for fdmcal.
//!
//! Presets are immutable tables. A [`Presets`] value is built once and
//! handed to whatever resolves configuration; nothing here reads global
//! mutable state.

pub mod filament;
pub mod printer;
pub mod templates;

pub use filament::{FilamentPreset, FILAMENTS};
pub use printer::{PrinterPreset, DEFAULT_PRINTER, PRINTERS};
pub use templates::{builtin, BuiltinTemplates, COREONE_END, COREONE_START};

use tracing::debug;

/// Lookup tables for printers and filaments.
#[derive(Debug, Clone, Copy)]
pub struct Presets {
    printers: &'static [PrinterPreset],
    filaments: &'static [FilamentPreset],
}

impl Default for Presets {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Presets {
    /// The built-in tables.
    pub fn builtin() -> Self {
        Self {
            printers: PRINTERS,
            filaments: FILAMENTS,
        }
    }

    /// All printers.
    pub fn printers(&self) -> &'static [PrinterPreset] {
        self.printers
    }

    /// All filaments.
    pub fn filaments(&self) -> &'static [FilamentPreset] {
        self.filaments
    }

    /// Printer by key, ignoring case.
    pub fn printer(&self, key: &str) -> Option<&'static PrinterPreset> {
        let found = self
            .printers
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key));
        debug!(key, found = found.is_some(), "printer lookup");
        found
    }

    /// Filament by key, ignoring case.
    pub fn filament(&self, key: &str) -> Option<&'static FilamentPreset> {
        let found = self
            .filaments
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(key));
        debug!(key, found = found.is_some(), "filament lookup");
        found
    }

    /// The default printer.
    pub fn default_printer(&self) -> Option<&'static PrinterPreset> {
        self.printer(DEFAULT_PRINTER)
    }

    /// Comma-separated printer keys.
    pub fn printer_keys(&self) -> String {
        join_keys(self.printers.iter().map(|p| p.key))
    }

    /// Comma-separated filament keys.
    pub fn filament_keys(&self) -> String {
        join_keys(self.filaments.iter().map(|f| f.key))
    }
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let presets = Presets::builtin();
        assert_eq!(presets.printer("mk4s").unwrap().bed_y, 210.0);
        assert_eq!(presets.printer("CoreOneL").unwrap().max_z, 330.0);
        assert!(presets.printer("ender3").is_none());
        assert_eq!(presets.filament("petg").unwrap().hotend_temp, 235);
        assert!(presets.filament("wood").is_none());
        assert_eq!(presets.default_printer().unwrap().key, "COREONE");
    }

    #[test]
    fn test_keys() {
        let presets = Presets::default();
        assert_eq!(presets.printer_keys(), "MINI, MK4S, COREONE, COREONEL, XL");
        assert_eq!(
            presets.filament_keys(),
            "PLA, PETG, ABS, ASA, PA, TPU, PC"
        );
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(Presets::builtin().filaments()).unwrap();
        assert_eq!(json[0]["key"], "PLA");
        assert_eq!(json[0]["retract_length"], 0.6);
    }
}
