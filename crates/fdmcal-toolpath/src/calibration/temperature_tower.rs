//! Temperature tower calibration: one module per temperature, stacked.

use tracing::debug;

use super::{
    bed_overflow, emit_template, fan, header, height_overflow, section, CalibrationProgram,
    Generated, Templates,
};
use crate::command::{round_to, Command, Z_PLACES};
use crate::config::{MachineSettings, TowerSettings};
use crate::error::Result;
use crate::extrusion::Bead;
use crate::label::{Label, LabelStyle};
use crate::motion::Emitter;
use crate::path::{BoundingBox, Point2};
use crate::pattern::tower::{LONG_WALL_BASE, SHORT_WALL_BASE};
use crate::pattern::{LayerRole, Segment, TowerPlan, TowerSpec};
use crate::shapes::{circle, fill_rect};
use crate::template::standard_vars;
use crate::warning::Warning;

/// Clearance between the anchor loops and the tower body (mm).
const ANCHOR_CLEARANCE: f64 = 1.0;

/// Fixed X/Y anchors of the tower on the bed.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerLayout {
    /// Occupied bed area, anchor included.
    pub footprint: BoundingBox,
    /// Front edge of the body (mm).
    pub y0: f64,
    /// Right edge of the short wall (mm).
    pub short_x1: f64,
    /// Left edge of the long wall (mm).
    pub long_x0: f64,
}

impl TowerLayout {
    /// Centre the tower body and its anchor margin on the bed.
    pub fn new(machine: &MachineSettings, spec: &TowerSpec) -> Self {
        let margin = machine.anchor.margin(
            machine.anchor_perimeters,
            machine.anchor_spacing(),
            ANCHOR_CLEARANCE,
        );
        let full_w = spec.body_width() + 2.0 * margin;
        let full_h = spec.module_depth + 2.0 * margin;
        let origin = Point2::new(
            (machine.bed_x - full_w) / 2.0,
            (machine.bed_y - full_h) / 2.0,
        );
        let short_x1 = origin.x + margin + spec.max_short_width();
        Self {
            footprint: BoundingBox::from_origin(origin, full_w, full_h),
            y0: origin.y + margin,
            short_x1,
            long_x0: short_x1 + spec.bridge_length,
        }
    }

    /// Temperature label for `segment`, centred on its slab.
    pub fn label(&self, spec: &TowerSpec, segment: &Segment) -> Label {
        let style = LabelStyle::default();
        let text = segment.temperature.to_string();
        let probe = Label::new(Point2::origin(), &text, style);
        let origin = Point2::new(
            self.short_x1 + (spec.bridge_length - probe.width()) / 2.0,
            self.y0 + (spec.module_depth - style.glyph_height()) / 2.0,
        );
        Label { origin, ..probe }
    }
}

fn label_box(label: &Label) -> Option<BoundingBox> {
    let strokes = label.strokes();
    BoundingBox::of_points(strokes.iter().flat_map(|(a, b)| [a, b]))
}

fn overlaps(center: Point2, radius: f64, area: &BoundingBox, clearance: f64) -> bool {
    center.x + radius + clearance > area.min.x
        && center.x - radius - clearance < area.max.x
        && center.y + radius + clearance > area.min.y
        && center.y - radius - clearance < area.max.y
}

struct TowerPass<'a> {
    spec: &'a TowerSpec,
    plan: &'a TowerPlan,
    layout: &'a TowerLayout,
}

impl TowerPass<'_> {
    fn base(&self, em: &mut Emitter, bead: Bead) {
        let x0 = self.layout.short_x1 - SHORT_WALL_BASE;
        let width = SHORT_WALL_BASE + self.spec.bridge_length + LONG_WALL_BASE;
        fill_rect(em, Point2::new(x0, self.layout.y0), width, self.spec.module_depth, bead);
    }

    fn body(&self, em: &mut Emitter, layer: usize, layer_in_segment: usize, bead: Bead) {
        let spec = self.spec;
        let l = self.layout;
        let local_z = round_to(layer_in_segment as f64 * bead.layer_height, Z_PLACES);

        let short_w = spec.short_wall_width(local_z);
        if short_w > bead.line_width {
            fill_rect(
                em,
                Point2::new(l.short_x1 - short_w, l.y0),
                short_w,
                spec.module_depth,
                bead,
            );
        }
        let long_w = spec.long_wall_width(local_z);
        if long_w > bead.line_width {
            fill_rect(em, Point2::new(l.long_x0, l.y0), long_w, spec.module_depth, bead);
        }

        let labelled = self.plan.label_on(layer);
        let label = labelled.map(|s| l.label(spec, s));
        let keep_clear = label.as_ref().and_then(label_box);
        let cy = l.y0 + spec.module_depth / 2.0;
        for cone in spec.cones(local_z) {
            let center = Point2::new(l.short_x1 + cone.offset_x, cy);
            if let Some(area) = &keep_clear {
                if overlaps(center, cone.radius, area, bead.line_width) {
                    continue;
                }
            }
            if let Some(ring) = circle(center, cone.radius, bead.line_width) {
                em.trace_loop(&ring, bead);
            }
        }

        if spec.is_slab(local_z) {
            fill_rect(
                em,
                Point2::new(l.short_x1, l.y0),
                spec.bridge_length,
                spec.module_depth,
                bead,
            );
        }

        if let (Some(segment), Some(label)) = (labelled, label) {
            em.comment(format!("Label pass {} C", segment.temperature));
            label.emit(em, bead);
        }
    }

    fn label_only(&self, em: &mut Emitter, layer: usize, bead: Bead) {
        if let Some(segment) = self.plan.label_on(layer) {
            let label = self.layout.label(self.spec, segment);
            em.comment(format!("Label pass {} C", segment.temperature));
            label.emit(em, bead);
        }
    }
}

fn show_temperature(em: &mut Emitter, celsius: u32, show_lcd: bool) {
    if show_lcd {
        em.push(Command::Display(format!("Temp: {celsius}C")));
    }
}

impl CalibrationProgram for TowerSettings {
    fn name(&self) -> &'static str {
        "temperature-tower"
    }

    fn validate(&self) -> Result<()> {
        TowerSettings::validate(self)
    }

    fn generate(&self, templates: &Templates) -> Result<Generated> {
        TowerSettings::validate(self)?;
        let spec = &self.tower;
        let sweep = self.sweep();
        let (temps, uneven) = sweep.temperatures();
        let m = self.print_machine();

        let plan = TowerPlan::new(spec, &temps, m.layer_height, self.label_tab);
        let layer_count = plan.total_layers();
        let max_layer_z = round_to(m.layer_z(layer_count - 1), Z_PLACES);
        let layout = TowerLayout::new(&m, spec);
        debug!(
            segments = plan.segments.len(),
            layers = layer_count,
            max_layer_z,
            "temperature tower plan"
        );

        let mut warnings = Vec::new();
        if uneven {
            let last = temps[temps.len() - 2];
            warnings.push(Warning::UnevenTemperatureStep {
                span: (self.temp_end - self.temp_start).abs(),
                step: self.temp_step,
                last_step: (self.temp_end - last).abs(),
                end: self.temp_end,
            });
        }
        warnings.extend(bed_overflow(&m, &layout.footprint, None));
        warnings.extend(height_overflow(&m, max_layer_z));
        warnings.iter().for_each(Warning::log);

        let vars = standard_vars(&m, max_layer_z, &layout.footprint);
        let mut em = Emitter::new(m.motion(), m.extrusion());

        header(
            &mut em,
            "Temperature Tower Calibration",
            &[
                format!(
                    "Temp range: {} -> {} C  step {} C  ({} segments)",
                    self.temp_start,
                    self.temp_end,
                    self.temp_step,
                    plan.segments.len()
                ),
                format!(
                    "Module: {} mm tall  {} mm deep  bridge {} mm  ({} layers/seg @ {} mm)",
                    spec.module_height,
                    spec.module_depth,
                    spec.bridge_length,
                    plan.layers_per_segment,
                    m.layer_height
                ),
                format!(
                    "Walls: short {} deg  long {} deg  {} stringing cone(s)  bridge slab {} mm",
                    spec.short_angle, spec.long_angle, spec.n_cones, spec.bridge_thick
                ),
                format!(
                    "Nozzle: {} mm   Filament: {} mm",
                    m.nozzle_diameter, m.filament_diameter
                ),
                format!(
                    "Bed: {} C   Retraction: {} mm @ {} mm/s",
                    m.bed_temp, m.retract_length, m.retract_speed
                ),
            ],
        );
        emit_template(&mut em, "START", &templates.start, &vars);
        fan(&mut em, m.first_layer_fan);

        let pass = TowerPass {
            spec,
            plan: &plan,
            layout: &layout,
        };
        for layer in 0..layer_count {
            let first = layer == 0;
            let bead = if first {
                m.first_layer_bead()
            } else {
                m.layer_bead()
            };
            let z = round_to(m.layer_z(layer), Z_PLACES);
            let role = plan.role(layer);
            let temp = plan.temperature_at(layer).unwrap_or(temps[0]).max(0) as u32;

            let what = match role {
                LayerRole::Base => "BASE".to_string(),
                LayerRole::Body { segment, .. } => format!("seg {segment}  {temp} C"),
                LayerRole::LabelOnly { .. } => "LABEL".to_string(),
            };
            section(&mut em, &format!("LAYER {}  Z={z}  {what}", layer + 1));

            if first {
                em.set_z(z);
                em.push(Command::HotendTemp {
                    celsius: temp,
                    wait: true,
                });
                show_temperature(&mut em, temp, m.show_lcd);
                let f = &layout.footprint;
                m.anchor.render(
                    &mut em,
                    f.min,
                    f.width(),
                    f.height(),
                    m.anchor_perimeters,
                    m.anchor_bead(),
                );
            } else {
                em.move_to_layer(z);
                if layer == 1 {
                    fan(&mut em, m.fan_speed);
                }
                if let LayerRole::Body {
                    segment,
                    layer_in_segment: 0,
                } = role
                {
                    if segment > 0 {
                        em.push(Command::HotendTemp {
                            celsius: temp,
                            wait: false,
                        });
                        show_temperature(&mut em, temp, m.show_lcd);
                    }
                }
            }

            match role {
                LayerRole::Base => pass.base(&mut em, bead),
                LayerRole::Body {
                    layer_in_segment, ..
                } => pass.body(&mut em, layer, layer_in_segment, bead),
                LayerRole::LabelOnly { .. } => pass.label_only(&mut em, layer, bead),
            }
        }

        em.blank();
        emit_template(&mut em, "END", &templates.end, &vars);
        em.comment("Done! Examine each segment for overhang / stringing / bridging quality.");
        em.comment(format!(
            "Bottom segment = {} C, top = {} C.",
            temps[0],
            temps[temps.len() - 1]
        ));

        Ok(Generated {
            program: em.finish(),
            warnings,
            layer_count,
            max_layer_z,
            footprint: layout.footprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::tower::CONE_INSET;

    fn templates() -> Templates {
        Templates::new("M83\nM104 S{hotend_temp}", "G1 Z{park_z}\nM84")
    }

    fn temperature_commands(out: &Generated) -> Vec<(u32, bool)> {
        out.program
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::HotendTemp { celsius, wait } => Some((*celsius, *wait)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_tower() {
        let settings = TowerSettings::default();
        let out = settings.generate(&templates()).unwrap();
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        // 5 base layers, 7 segments of 50 layers, 5 label passes on top
        assert_eq!(out.layer_count, 5 + 7 * 50 + 5);
        assert!(out.footprint.fits_bed(250.0, 220.0));

        let temps = temperature_commands(&out);
        assert_eq!(temps[0], (215, true));
        assert_eq!(
            &temps[1..],
            &[
                (210, false),
                (205, false),
                (200, false),
                (195, false),
                (190, false),
                (185, false)
            ]
        );
        let text = out.to_gcode();
        assert!(text.contains("M104 S215\n"));
        assert!(text.contains("M117 Temp: 185C"));
    }

    #[test]
    fn test_segment_boundaries_on_layers() {
        let settings = TowerSettings::default();
        let out = settings.generate(&templates()).unwrap();
        let lines: Vec<String> = out
            .program
            .commands()
            .iter()
            .map(|c| c.to_string())
            .collect();
        // the first non-blocking change follows the layer 56 header
        let header = lines
            .iter()
            .position(|l| l.starts_with("; --- LAYER 56 "))
            .unwrap();
        let change = lines.iter().position(|l| l == "M104 S210").unwrap();
        assert!(change > header);
        let next = lines
            .iter()
            .position(|l| l.starts_with("; --- LAYER 57 "))
            .unwrap();
        assert!(change < next);
    }

    #[test]
    fn test_uneven_step_warning() {
        let settings = TowerSettings {
            temp_start: 200,
            temp_end: 230,
            temp_step: 7.0,
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        assert!(matches!(
            out.warnings.first(),
            Some(Warning::UnevenTemperatureStep {
                last_step: 2,
                end: 230,
                ..
            })
        ));
        let last = temperature_commands(&out).last().copied();
        assert_eq!(last, Some((230, false)));
    }

    #[test]
    fn test_height_overflow() {
        let settings = TowerSettings {
            machine: MachineSettings {
                max_z: 50.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::HeightOverflow { .. })));
    }

    #[test]
    fn test_bed_overflow_has_no_suggestion() {
        let settings = TowerSettings {
            machine: MachineSettings {
                bed_x: 60.0,
                ..Default::default()
            },
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
    }

    #[test]
    fn test_labels_off_no_extra_layers() {
        let settings = TowerSettings {
            label_tab: false,
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        assert_eq!(out.layer_count, 5 + 7 * 50);
        assert!(!out.to_gcode().contains("Label pass"));
    }

    #[test]
    fn test_label_centred_in_gap() {
        let settings = TowerSettings::default();
        let layout = TowerLayout::new(&settings.machine, &settings.tower);
        let segment = Segment {
            index: 0,
            temperature: 215,
            layers: 5..55,
        };
        let label = layout.label(&settings.tower, &segment);
        let b = label_box(&label).unwrap();
        let gap_mid = layout.short_x1 + settings.tower.bridge_length / 2.0;
        assert!(((b.min.x + b.max.x) / 2.0 - gap_mid).abs() < 1e-9);
        assert!(b.min.x > layout.short_x1 && b.max.x < layout.long_x0);
        // default cones stay clear of the label
        let cone = layout.short_x1 + CONE_INSET;
        assert!(cone + settings.tower.module_depth * 0.15 < b.min.x);
    }

    #[test]
    fn test_template_uses_first_segment_temperature() {
        let settings = TowerSettings {
            temp_start: 240,
            temp_end: 220,
            ..Default::default()
        };
        let out = settings.generate(&templates()).unwrap();
        assert!(out.to_gcode().contains("M104 S240\n"));
    }
}
