//! Built-in start and end G-code.
//!
//! Only the Core One sequence ships; other printers fall back to it.

use fdmcal_toolpath::Templates;

/// Core One start sequence: checks, heating, mesh levelling and purge line.
pub const COREONE_START: &str = r#"M17 ; enable steppers
M862.1 P{nozzle_dia} ; nozzle check
M862.3 P "COREONE" ; printer model check
M862.5 P2 ; g-code level check
M862.6 P"Input shaper" ; FW feature check
M115 U6.4.0+11974
M555 X{m555_x} Y{m555_y} W{m555_w} H{m555_h}
G90 ; use absolute coordinates
M83 ; extruder relative mode
M140 S{bed_temp} ; set bed temp
M109 R{mbl_temp} ; preheat nozzle to no-ooze temp for bed leveling
M84 E ; turn off E motor
G28 ; home all without mesh bed level
M104 S100 ; set idle temp
M190 R{bed_temp} ; wait for bed temp
{cool_fan}
G0 Z40 F10000
M104 S100 ; keep idle temp
M190 R{bed_temp} ; wait for bed temp (confirm after Z move)
M107
G29 G ; absorb heat
M109 R{mbl_temp} ; wait for MBL temp
M302 S155 ; lower cold extrusion limit to 155 C
G1 E-2 F2400 ; retraction
M84 E ; turn off E motor
G29 P9 X208 Y-2.5 W32 H4
;
; MBL
;
M84 E ; turn off E motor
G29 P1 ; invalidate mbl and probe print area
G29 P1 X150 Y0 W100 H20 C ; probe near purge place
G29 P3.2 ; interpolate mbl probes
G29 P3.13 ; extrapolate mbl outside probe area
G29 A ; activate mbl
; prepare for purge
M104 S{hotend_temp}
G0 X249 Y-2.5 Z15 F4800 ; move away and ready for the purge
M109 S{hotend_temp}
G92 E0
M569 S0 E ; set spreadcycle mode for extruder
M591 S0 ; disable stuck filament detection
;
; Purge line
;
G92 E0 ; reset extruder position
G1 E2 F2400 ; deretraction after the initial one
G0 E5 X235 Z0.2 F500 ; purge
G0 X225 E4 F500 ; purge
G0 X215 E4 F650 ; purge
G0 X205 E4 F800 ; purge
G0 X202 Z0.05 F8000 ; wipe, move close to the bed
G0 X199 Z0.2 F8000 ; wipe, move away from the bed
M591 R ; restore stuck filament detection
G92 E0
M221 S100 ; set flow to 100%
"#;

/// Core One end sequence: park, heaters off, advance reset.
pub const COREONE_END: &str = r#"G1 Z{park_z} F720 ; move print head up
M104 S0 ; turn off hotend
M140 S0 ; turn off heatbed
M141 S0 ; disable chamber temp control
M107 ; turn off fan
G1 X242 Y211 F10200 ; park
G4 ; wait
M572 S0 ; reset pressure advance (ignored on Marlin)
M900 K0 ; reset Linear Advance
M84 X Y E ; disable motors
; max_layer_z = {max_layer_z}
"#;

/// Built-in templates for a printer key.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinTemplates {
    /// The templates.
    pub templates: Templates,
    /// True when the printer has no sequence of its own and the Core One
    /// sequence was substituted.
    pub fallback: bool,
}

/// Templates for `printer_key`.
pub fn builtin(printer_key: &str) -> BuiltinTemplates {
    BuiltinTemplates {
        templates: Templates::new(COREONE_START, COREONE_END),
        fallback: !printer_key.eq_ignore_ascii_case("COREONE"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdmcal_toolpath::{render, TemplateVars};

    #[test]
    fn test_coreone() {
        let b = builtin("coreone");
        assert!(!b.fallback);
        assert!(b.templates.start.contains("M862.3 P \"COREONE\""));
        assert!(b.templates.start.contains("M83 ; extruder relative mode"));
        assert!(b.templates.end.contains("G1 Z{park_z} F720"));
        assert!(builtin("XL").fallback);
    }

    #[test]
    fn test_placeholders_resolve() {
        let mut vars = TemplateVars::new();
        for name in [
            "bed_temp",
            "hotend_temp",
            "mbl_temp",
            "nozzle_dia",
            "cool_fan",
            "m555_x",
            "m555_y",
            "m555_w",
            "m555_h",
            "park_z",
            "max_layer_z",
        ] {
            vars.set(name, 1);
        }
        let text = render(COREONE_START, &vars) + &render(COREONE_END, &vars);
        assert!(!text.contains('{'));
    }
}
