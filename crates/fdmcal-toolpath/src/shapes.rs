//! Shape primitives shared by anchors, tower walls and slabs.

use std::f64::consts::TAU;

use crate::extrusion::Bead;
use crate::motion::Emitter;
use crate::path::{Point2, Polygon, Polyline};

/// Minimum number of chords used for a circle.
pub const MIN_CIRCLE_SEGMENTS: usize = 12;

/// Slack when testing whether another fill row fits.
const ROW_EPSILON: f64 = 1e-6;

/// Closed rectangle perimeter from `(x0, y0)` to `(x1, y1)`.
pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
}

/// Up to `count` rectangles, each inset by `spacing` from the previous one.
///
/// Stops early once the inset rectangle has collapsed.
pub fn concentric_rectangles(
    min: Point2,
    width: f64,
    height: f64,
    spacing: f64,
    count: usize,
) -> Vec<Polygon> {
    let mut loops = Vec::with_capacity(count);
    for i in 0..count {
        let off = i as f64 * spacing;
        let (x0, y0) = (min.x + off, min.y + off);
        let (x1, y1) = (min.x + width - off, min.y + height - off);
        if x0 >= x1 || y0 >= y1 {
            break;
        }
        loops.push(rectangle(x0, y0, x1, y1));
    }
    loops
}

/// Horizontal back-and-forth rows covering `[min, max]` at `pitch`.
///
/// Row `k` sits at `min.y + k · pitch`; odd rows run right to left.
pub fn serpentine_fill(min: Point2, max: Point2, pitch: f64) -> Vec<Polyline> {
    if pitch <= 0.0 || min.x > max.x || min.y > max.y + ROW_EPSILON {
        return Vec::new();
    }
    let rows = ((max.y - min.y + ROW_EPSILON) / pitch).floor() as usize + 1;
    (0..rows)
        .map(|k| {
            let y = min.y + k as f64 * pitch;
            let (a, b) = if k % 2 == 0 {
                (min.x, max.x)
            } else {
                (max.x, min.x)
            };
            Polyline::new(vec![Point2::new(a, y), Point2::new(b, y)])
        })
        .collect()
}

/// Closed polygonal approximation of a circle.
///
/// Uses `max(12, ⌊2πr / line_width⌋)` chords; `None` when the radius is
/// below half a line width.
pub fn circle(center: Point2, radius: f64, line_width: f64) -> Option<Polygon> {
    if radius < line_width * 0.5 {
        return None;
    }
    let n = ((TAU * radius / line_width) as usize).max(MIN_CIRCLE_SEGMENTS);
    let points = (0..n)
        .map(|i| {
            let a = TAU * i as f64 / n as f64;
            Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect();
    Some(Polygon::new(points))
}

/// A rectangle printed solid: perimeter loops plus a serpentine core.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidRect {
    /// Perimeter loops, outermost first.
    pub loops: Vec<Polygon>,
    /// Core fill rows.
    pub rows: Vec<Polyline>,
}

impl SolidRect {
    /// Lay out a solid rectangle with `perimeters` loops at `spacing`.
    pub fn new(min: Point2, width: f64, height: f64, spacing: f64, perimeters: usize) -> Self {
        let loops = concentric_rectangles(min, width, height, spacing, perimeters);
        let inset = perimeters as f64 * spacing;
        let rows = serpentine_fill(
            Point2::new(min.x + inset, min.y + inset),
            Point2::new(min.x + width - inset, min.y + height - inset),
            spacing,
        );
        Self { loops, rows }
    }

    /// Print the loops then the core rows.
    pub fn emit(&self, em: &mut Emitter, bead: Bead) {
        for polygon in &self.loops {
            em.trace_loop(polygon, bead);
        }
        for row in &self.rows {
            em.trace(row, bead);
        }
    }
}

/// Print a solid rectangle with two perimeters.
pub fn fill_rect(em: &mut Emitter, min: Point2, width: f64, height: f64, bead: Bead) {
    SolidRect::new(min, width, height, bead.spacing(), 2).emit(em, bead);
}
