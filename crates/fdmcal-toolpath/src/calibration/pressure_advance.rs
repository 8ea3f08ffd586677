//! Pressure-advance calibration: a row of V-corner patterns, one K value each.

use tracing::debug;

use super::{
    bed_overflow, emit_template, fan, header, height_overflow, section, CalibrationProgram,
    Generated, Templates,
};
use crate::command::{round_to, Command, PA_PLACES, Z_PLACES};
use crate::config::PressureAdvanceSettings;
use crate::error::Result;
use crate::label::{Label, LabelStyle};
use crate::motion::Emitter;
use crate::path::{BoundingBox, Point2};
use crate::pattern::{AdvanceSweep, VCornerSpec};
use crate::template::standard_vars;
use crate::warning::Warning;

/// Labels sit this far above the anchor margin (mm).
const LABEL_LIFT: f64 = 0.5;

/// Placement of every pattern and label on the bed.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureAdvancePlan {
    /// K sweep.
    pub sweep: AdvanceSweep,
    /// Geometry of one pattern.
    pub pattern: VCornerSpec,
    /// Number of patterns.
    pub count: usize,
    /// Margin on the left, right and top (mm).
    pub margin: f64,
    /// Margin below the patterns, label row included (mm).
    pub bottom: f64,
    /// Occupied bed area, anchor included.
    pub footprint: BoundingBox,
    /// Gap between patterns (mm).
    pub pattern_spacing: f64,
    /// Label metrics, `None` when labels are off.
    pub label_style: Option<LabelStyle>,
}

impl PressureAdvancePlan {
    /// Lay out patterns centred on the bed.
    pub fn new(settings: &PressureAdvanceSettings) -> Self {
        let m = &settings.machine;
        let sweep = settings.sweep();
        let pattern = settings.pattern();
        let count = sweep.pattern_count();
        let margin = m
            .anchor
            .margin(m.anchor_perimeters, m.anchor_spacing(), settings.pattern_spacing);
        let label_style = settings.number_tab.then(|| LabelStyle {
            no_leading_zeros: settings.no_leading_zeros,
            ..LabelStyle::default()
        });
        let bottom = margin + label_style.map_or(0.0, |s| s.tab_height());

        let n = count as f64;
        let total_w = 2.0 * margin + n * pattern.width() + (n - 1.0) * settings.pattern_spacing;
        let total_h = bottom + margin + pattern.height();
        let origin = Point2::new((m.bed_x - total_w) / 2.0, (m.bed_y - total_h) / 2.0);

        Self {
            sweep,
            pattern,
            count,
            margin,
            bottom,
            footprint: BoundingBox::from_origin(origin, total_w, total_h),
            pattern_spacing: settings.pattern_spacing,
            label_style,
        }
    }

    /// Bounding-box origin of pattern `index`.
    pub fn pattern_origin(&self, index: usize) -> Point2 {
        let pitch = self.pattern.width() + self.pattern_spacing;
        Point2::new(
            self.footprint.min.x + self.margin + index as f64 * pitch,
            self.footprint.min.y + self.bottom,
        )
    }

    /// Value labels, only for even pattern indices.
    pub fn labels(&self) -> Vec<(usize, Label)> {
        let Some(style) = self.label_style else {
            return Vec::new();
        };
        let y = self.footprint.min.y + self.margin + LABEL_LIFT;
        (0..self.count)
            .step_by(2)
            .map(|i| {
                let origin = Point2::new(self.pattern_origin(i).x, y);
                (i, Label::number(origin, self.sweep.value(i), style))
            })
            .collect()
    }

    /// Largest whole side length that makes the footprint fit the bed.
    pub fn suggested_side_length(&self, bed_x: f64, bed_y: f64) -> Option<u32> {
        let n = self.count as f64;
        let width = (bed_x - 2.0 * self.margin - (n - 1.0) * self.pattern_spacing) / n;
        let height = bed_y - self.bottom - self.margin;
        let side = self.pattern.max_side_length(width, height).floor();
        (side >= 1.0).then_some(side as u32)
    }
}

fn set_advance(em: &mut Emitter, k: f64, show_lcd: bool) {
    em.push(Command::pressure_advance(k));
    if show_lcd {
        em.push(Command::Display(format!("LA {}", round_to(k, PA_PLACES))));
    }
}

impl CalibrationProgram for PressureAdvanceSettings {
    fn name(&self) -> &'static str {
        "pressure-advance"
    }

    fn validate(&self) -> Result<()> {
        PressureAdvanceSettings::validate(self)
    }

    fn generate(&self, templates: &Templates) -> Result<Generated> {
        PressureAdvanceSettings::validate(self)?;
        let m = &self.machine;
        let plan = PressureAdvancePlan::new(self);
        let layer_count = self.layer_count as usize;
        let max_layer_z = round_to(m.layer_z(layer_count - 1), Z_PLACES);
        debug!(
            patterns = plan.count,
            width = plan.footprint.width(),
            height = plan.footprint.height(),
            "pressure advance layout"
        );

        let mut warnings = Vec::new();
        if let Some(w) = bed_overflow(
            m,
            &plan.footprint,
            plan.suggested_side_length(m.bed_x, m.bed_y),
        ) {
            warnings.push(w);
        }
        warnings.extend(height_overflow(m, max_layer_z));
        warnings.iter().for_each(Warning::log);

        let vars = standard_vars(m, max_layer_z, &plan.footprint);
        let mut em = Emitter::new(m.motion(), m.extrusion());

        header(
            &mut em,
            "Linear Advance Calibration",
            &[
                format!(
                    "LA range: {} -> {}  step {}  ({} patterns)",
                    self.la_start, self.la_end, self.la_step, plan.count
                ),
                format!(
                    "Nozzle: {} mm   Filament: {} mm",
                    m.nozzle_diameter, m.filament_diameter
                ),
                format!(
                    "Line width: {:.3} mm ({} % of nozzle)",
                    m.line_width(),
                    m.line_width_pct
                ),
                format!(
                    "Layer height: {} mm   First layer: {} mm",
                    m.layer_height, m.first_layer_height
                ),
                format!(
                    "Print speed: {} mm/s   First layer: {} mm/s",
                    m.print_speed, m.first_layer_speed
                ),
                format!("Hotend: {} C   Bed: {} C", m.hotend_temp, m.bed_temp),
                format!(
                    "Retraction: {} mm @ {} mm/s   Z-hop: {} mm",
                    m.retract_length, m.retract_speed, m.zhop
                ),
                format!(
                    "Pattern area: {:.1}x{:.1} mm  centred on {}x{} mm bed",
                    plan.footprint.width(),
                    plan.footprint.height(),
                    m.bed_x,
                    m.bed_y
                ),
            ],
        );
        emit_template(&mut em, "START", &templates.start, &vars);

        section(&mut em, "CALIBRATION LAYERS");
        fan(&mut em, m.first_layer_fan);

        section(&mut em, "LAYER 1 (first layer)");
        em.set_z(round_to(m.first_layer_height, Z_PLACES));
        set_advance(&mut em, self.la_start, m.show_lcd);

        let f = &plan.footprint;
        m.anchor.render(
            &mut em,
            f.min,
            f.width(),
            f.height(),
            m.anchor_perimeters,
            m.anchor_bead(),
        );

        let first = m.first_layer_bead();
        let labels = plan.labels();
        if !labels.is_empty() {
            em.comment("Number labels");
            for (_, label) in &labels {
                label.emit(&mut em, first);
            }
        }

        em.comment("First layer patterns");
        let walls: Vec<_> = (0..plan.count)
            .map(|i| plan.pattern.walls(plan.pattern_origin(i)))
            .collect();
        for (i, pattern) in walls.iter().enumerate() {
            set_advance(&mut em, plan.sweep.value(i), m.show_lcd);
            for wall in pattern {
                em.trace(wall, first);
            }
        }

        let bead = m.layer_bead();
        for layer in 1..layer_count {
            let z = round_to(m.layer_z(layer), Z_PLACES);
            section(&mut em, &format!("LAYER {}  Z = {z}", layer + 1));
            em.move_to_layer(z);
            if layer == 1 {
                fan(&mut em, m.fan_speed);
            }
            for (i, pattern) in walls.iter().enumerate() {
                set_advance(&mut em, plan.sweep.value(i), m.show_lcd);
                for wall in pattern {
                    em.trace(wall, bead);
                }
            }
        }

        em.blank();
        section(&mut em, "PATTERNS DONE");
        set_advance(&mut em, self.la_start, m.show_lcd);
        emit_template(&mut em, "END", &templates.end, &vars);
        em.comment("Done! Pick the corner with the sharpest finish.");
        em.comment("Bulge at corner tip = K too high.");
        em.comment("Gap / underextrusion before corner = K too low.");

        Ok(Generated {
            program: em.finish(),
            warnings,
            layer_count,
            max_layer_z,
            footprint: plan.footprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorMode;
    use crate::config::MachineSettings;
    use crate::error::ToolpathError;

    fn templates() -> Templates {
        Templates::new("M83\nM140 S{bed_temp}\nM555 X{m555_x}", "G1 Z{park_z}\nM84")
    }

    fn k_values(generated: &Generated) -> Vec<f64> {
        generated
            .program
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::PressureAdvance { k } => Some(*k),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_run() {
        let settings = PressureAdvanceSettings::default();
        let out = settings.generate(&templates()).unwrap();
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.layer_count, 4);
        assert_eq!(out.max_layer_z, 0.85);
        assert!(out.footprint.fits_bed(250.0, 220.0));

        // start K, then five patterns on each of four layers, then the reset
        let ks = k_values(&out);
        assert_eq!(ks.len(), 1 + 5 * 4 + 1);
        assert_eq!(&ks[1..6], &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ks.last(), Some(&0.0));

        let text = out.to_gcode();
        assert!(text.contains("M140 S60"));
        assert!(text.contains("G1 Z1.85"));
        assert!(text.contains("M117 LA 3"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn test_label_parity() {
        let plan = PressureAdvancePlan::new(&PressureAdvanceSettings::default());
        let indices: Vec<usize> = plan.labels().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2, 4]);

        let six = PressureAdvanceSettings {
            la_end: 5.0,
            side_length: 15.0,
            ..Default::default()
        };
        let plan = PressureAdvancePlan::new(&six);
        let indices: Vec<usize> = plan.labels().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2, 4]);
        assert!(indices.iter().all(|i| i % 2 == 0));
    }

    #[test]
    fn test_labels_sit_below_patterns() {
        let plan = PressureAdvancePlan::new(&PressureAdvanceSettings::default());
        let pattern_y = plan.pattern_origin(0).y;
        for (_, label) in plan.labels() {
            let top = label.origin.y + label.style.glyph_height();
            assert!(top < pattern_y);
        }
    }

    #[test]
    fn test_patterns_inside_footprint() {
        let plan = PressureAdvancePlan::new(&PressureAdvanceSettings::default());
        let last = plan.pattern.bounding_box(plan.pattern_origin(plan.count - 1));
        assert!(last.max.x <= plan.footprint.max.x - plan.margin + 1e-9);
        assert!(last.max.y <= plan.footprint.max.y - plan.margin + 1e-9);
    }

    #[test]
    fn test_no_labels_no_tab() {
        let settings = PressureAdvanceSettings {
            number_tab: false,
            ..Default::default()
        };
        let plan = PressureAdvancePlan::new(&settings);
        assert!(plan.labels().is_empty());
        assert_eq!(plan.bottom, plan.margin);
    }

    #[test]
    fn test_bed_overflow_suggestion_fits() {
        let settings = PressureAdvanceSettings {
            la_end: 0.1,
            la_step: 0.01,
            side_length: 20.0,
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        let suggested = match out.warnings.first() {
            Some(Warning::BedOverflow {
                suggested_side_length: Some(l),
                ..
            }) => *l,
            other => panic!("expected bed overflow, got {other:?}"),
        };
        assert!((suggested as f64) < settings.side_length);

        let fixed = PressureAdvanceSettings {
            side_length: suggested as f64,
            ..settings
        };
        let plan = PressureAdvancePlan::new(&fixed);
        assert!(plan.footprint.width() <= fixed.machine.bed_x);
        assert!(plan.footprint.height() <= fixed.machine.bed_y);
        let out = fixed.generate(&templates()).unwrap();
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_overflow_without_fix() {
        let settings = PressureAdvanceSettings {
            la_end: 100.0,
            la_step: 1.0,
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        assert!(matches!(
            out.warnings.first(),
            Some(Warning::BedOverflow {
                suggested_side_length: None,
                ..
            })
        ));
        // geometry is still produced
        assert!(out.program.len() > 100);
    }

    #[test]
    fn test_fails_before_geometry() {
        let settings = PressureAdvanceSettings {
            la_step: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.generate(&templates()),
            Err(ToolpathError::SweepDirection { .. })
        ));
    }

    #[test]
    fn test_no_anchor_margin() {
        let settings = PressureAdvanceSettings {
            machine: MachineSettings {
                anchor: AnchorMode::None,
                ..Default::default()
            },
            ..Default::default()
        };
        let plan = PressureAdvancePlan::new(&settings);
        assert_eq!(plan.margin, 2.0);
        let out = settings.generate(&templates()).unwrap();
        assert!(!out.to_gcode().contains("Anchor"));
    }

    #[test]
    fn test_fan_switches_on_layer_two() {
        let out = PressureAdvanceSettings::default()
            .generate(&templates())
            .unwrap();
        let fans: Vec<u32> = out
            .program
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Fan { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(fans, vec![0, 100]);
    }
}
