//! Start/end G-code template interpolation.
//!
//! The only placeholder form is `{name}` where `name` matches
//! `[a-z][a-z0-9_]*`. A placeholder is replaced when `name` is present in
//! the variable map; everything else, including unknown names and
//! `{if ...}` expressions, is copied through unchanged.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::command::{round_to, Z_PLACES};
use crate::config::MachineSettings;
use crate::path::BoundingBox;

/// Named values available to templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to the display form of `value`.
    pub fn set(&mut self, name: &str, value: impl Display) -> &mut Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([a-z][a-z0-9_]*)\}").expect("invalid placeholder pattern")
    })
}

/// Substitute known `{name}` placeholders in `template`.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            vars.get(&caps[1]).unwrap_or(&caps[0]).to_string()
        })
        .into_owned()
}

/// Print-area rectangle reported with `M555`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintArea {
    /// Left edge (mm).
    pub x: i64,
    /// Front edge (mm).
    pub y: i64,
    /// Width (mm).
    pub w: i64,
    /// Depth (mm).
    pub h: i64,
}

/// Purge-line allowance to the left of the print (mm).
const PURGE_X: f64 = 32.0;
/// Purge-line allowance in front of the print (mm).
const PURGE_Y: f64 = 4.0;

/// Print area for a footprint, widened to include the purge line.
pub fn print_area(bed_x: f64, footprint: &BoundingBox) -> PrintArea {
    let x = (footprint.min.x + PURGE_X).min(bed_x) - PURGE_X;
    let y = footprint.min.y.max(0.0) - PURGE_Y;
    let w = (footprint.min.x + PURGE_X).max(footprint.max.x).min(bed_x) - x;
    let h = footprint.max.y - y;
    PrintArea {
        x: x.round() as i64,
        y: y.round() as i64,
        w: w.round() as i64,
        h: h.round() as i64,
    }
}

/// Enclosure cooling line for low bed temperatures.
const COOL_ENCLOSURE: &str = "M106 S70  ; cool enclosure (PLA bed temp)";

/// Standard variables shared by both calibrations.
pub fn standard_vars(
    machine: &MachineSettings,
    max_layer_z: f64,
    footprint: &BoundingBox,
) -> TemplateVars {
    let area = print_area(machine.bed_x, footprint);
    let mut vars = TemplateVars::new();
    vars.set("bed_temp", machine.bed_temp)
        .set("hotend_temp", machine.hotend_temp)
        .set("mbl_temp", machine.hotend_temp.saturating_sub(50).max(155))
        .set("nozzle_dia", machine.nozzle_diameter)
        .set("filament_dia", machine.filament_diameter)
        .set(
            "cool_fan",
            if machine.bed_temp <= 60 {
                COOL_ENCLOSURE
            } else {
                "M107"
            },
        )
        .set("m555_x", area.x)
        .set("m555_y", area.y)
        .set("m555_w", area.w)
        .set("m555_h", area.h)
        .set(
            "park_z",
            round_to((max_layer_z + 1.0).min(machine.max_z), Z_PLACES),
        )
        .set("max_layer_z", max_layer_z);
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Point2;

    fn vars() -> TemplateVars {
        let mut v = TemplateVars::new();
        v.set("bed_temp", 60).set("nozzle_dia", 0.4);
        v
    }

    #[test]
    fn test_render_known() {
        assert_eq!(
            render("M140 S{bed_temp}\nM862.1 P{nozzle_dia}", &vars()),
            "M140 S60\nM862.1 P0.4"
        );
    }

    #[test]
    fn test_render_passthrough() {
        let v = vars();
        assert_eq!(render("M104 S{unknown_var}", &v), "M104 S{unknown_var}");
        assert_eq!(
            render("{if bed_temp>60}M107{endif}", &v),
            "{if bed_temp>60}M107{endif}"
        );
        assert_eq!(render("{Bed_temp} {1x} {}", &v), "{Bed_temp} {1x} {}");
        assert_eq!(render("open { brace {bed_temp}", &v), "open { brace 60");
        assert_eq!(render("trailing {", &v), "trailing {");
        assert_eq!(render("", &v), "");
        assert_eq!(render("{{bed_temp}}", &v), "{60}");
        assert_eq!(render("{bed_temp}{nozzle_dia}", &v), "600.4");
    }

    #[test]
    fn test_print_area() {
        let fp = BoundingBox::from_origin(Point2::new(50.0, 80.0), 150.0, 60.0);
        let a = print_area(250.0, &fp);
        assert_eq!(a, PrintArea { x: 50, y: 76, w: 150, h: 64 });

        let narrow = BoundingBox::from_origin(Point2::new(100.0, 10.0), 10.0, 10.0);
        let a = print_area(250.0, &narrow);
        // widened to the purge allowance
        assert_eq!(a.w, 32);
    }

    #[test]
    fn test_standard_vars() {
        let machine = MachineSettings::default();
        let fp = BoundingBox::from_origin(Point2::new(50.0, 80.0), 150.0, 60.0);
        let v = standard_vars(&machine, 0.85, &fp);
        assert_eq!(v.get("mbl_temp"), Some("165"));
        assert_eq!(v.get("park_z"), Some("1.85"));
        assert_eq!(v.get("max_layer_z"), Some("0.85"));
        assert_eq!(v.get("cool_fan"), Some(COOL_ENCLOSURE));

        let hot_bed = MachineSettings {
            bed_temp: 100,
            hotend_temp: 180,
            ..Default::default()
        };
        let v = standard_vars(&hot_bed, 300.0, &fp);
        assert_eq!(v.get("cool_fan"), Some("M107"));
        assert_eq!(v.get("mbl_temp"), Some("155"));
        assert_eq!(v.get("park_z"), Some("270"));
    }
}
