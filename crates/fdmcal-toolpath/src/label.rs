//! Seven-segment number labels drawn as extruded strokes.
//!
//! A glyph occupies a `seg_len × 2·seg_len` cell with its origin at the
//! bottom-left corner. Glyphs advance left to right by `seg_len + gap`; a
//! decimal point is a short horizontal stroke on the baseline.

use crate::command::{round_to, PA_PLACES};
use crate::extrusion::Bead;
use crate::motion::Emitter;
use crate::path::Point2;

/// Default bar length (mm).
pub const SEG_LEN: f64 = 2.0;
/// Default gap between glyphs (mm).
pub const GLYPH_GAP: f64 = 1.0;
/// Length of the decimal point stroke (mm).
pub const POINT_LEN: f64 = 0.6;
/// Label strokes are printed at this fraction of the normal line width.
pub const STROKE_WIDTH_RATIO: f64 = 0.8;
/// Padding added to the glyph height when reserving a label row (mm).
const TAB_PADDING: f64 = 3.0;

/// One bar of a seven-segment cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Top bar.
    Top,
    /// Upper right bar.
    TopRight,
    /// Lower right bar.
    BottomRight,
    /// Bottom bar.
    Bottom,
    /// Lower left bar.
    BottomLeft,
    /// Upper left bar.
    TopLeft,
    /// Middle bar.
    Middle,
}

impl Segment {
    /// Bars in drawing order.
    pub const ALL: [Segment; 7] = [
        Segment::Top,
        Segment::TopRight,
        Segment::BottomRight,
        Segment::Bottom,
        Segment::BottomLeft,
        Segment::TopLeft,
        Segment::Middle,
    ];

    /// Stroke end points for a cell at `origin`.
    pub fn stroke(self, origin: Point2, seg_len: f64) -> (Point2, Point2) {
        let (x, y, s) = (origin.x, origin.y, seg_len);
        let p = Point2::new;
        match self {
            Segment::Top => (p(x, y + 2.0 * s), p(x + s, y + 2.0 * s)),
            Segment::TopRight => (p(x + s, y + s), p(x + s, y + 2.0 * s)),
            Segment::BottomRight => (p(x + s, y), p(x + s, y + s)),
            Segment::Bottom => (p(x, y), p(x + s, y)),
            Segment::BottomLeft => (p(x, y), p(x, y + s)),
            Segment::TopLeft => (p(x, y + s), p(x, y + 2.0 * s)),
            Segment::Middle => (p(x, y + s), p(x + s, y + s)),
        }
    }
}

/// Lit bars per digit, in [`Segment::ALL`] order.
pub const DIGIT_SEGMENTS: [[bool; 7]; 10] = {
    const O: bool = true;
    const X: bool = false;
    [
        [O, O, O, O, O, O, X], // 0
        [X, O, O, X, X, X, X], // 1
        [O, O, X, O, O, X, O], // 2
        [O, O, O, O, X, X, O], // 3
        [X, O, O, X, X, O, O], // 4
        [O, X, O, O, X, O, O], // 5
        [O, X, O, O, O, O, O], // 6
        [O, O, O, X, X, X, X], // 7
        [O, O, O, O, O, O, O], // 8
        [O, O, O, O, X, O, O], // 9
    ]
};

/// A printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Decimal digit 0-9.
    Digit(u8),
    /// Decimal point.
    Point,
    /// Anything else: advances like a digit, draws nothing.
    Space,
}

impl Glyph {
    /// Map a character to its glyph.
    pub fn from_char(c: char) -> Self {
        match c {
            '0'..='9' => Glyph::Digit(c as u8 - b'0'),
            '.' => Glyph::Point,
            _ => Glyph::Space,
        }
    }

    /// Strokes for this glyph at `origin`.
    pub fn strokes(self, origin: Point2, seg_len: f64) -> Vec<(Point2, Point2)> {
        match self {
            Glyph::Digit(d) => Segment::ALL
                .iter()
                .zip(DIGIT_SEGMENTS[d as usize % 10])
                .filter(|(_, lit)| *lit)
                .map(|(seg, _)| seg.stroke(origin, seg_len))
                .collect(),
            Glyph::Point => vec![(origin, Point2::new(origin.x + POINT_LEN, origin.y))],
            Glyph::Space => Vec::new(),
        }
    }

    /// Horizontal advance to the next glyph.
    pub fn advance(self, seg_len: f64, gap: f64) -> f64 {
        match self {
            Glyph::Point => POINT_LEN + gap,
            Glyph::Digit(_) | Glyph::Space => seg_len + gap,
        }
    }
}

/// Glyph metrics and text options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Bar length (mm).
    pub seg_len: f64,
    /// Gap between glyphs (mm).
    pub gap: f64,
    /// Print `0.05` as `.05`.
    pub no_leading_zeros: bool,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            seg_len: SEG_LEN,
            gap: GLYPH_GAP,
            no_leading_zeros: false,
        }
    }
}

impl LabelStyle {
    /// Height of one glyph.
    pub fn glyph_height(&self) -> f64 {
        2.0 * self.seg_len
    }

    /// Vertical space reserved for a row of labels.
    pub fn tab_height(&self) -> f64 {
        self.glyph_height() + TAB_PADDING
    }
}

/// Label text for `value`: four decimals, trailing zeros stripped.
pub fn format_value(value: f64, no_leading_zeros: bool) -> String {
    let value = round_to(value, PA_PLACES);
    let fixed = format!("{:.*}", PA_PLACES as usize, value);
    let mut text = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    };
    if !text.contains('.') && value != value.trunc() {
        text = format!("{value:.1}");
    }
    if no_leading_zeros && text.starts_with("0.") {
        text.remove(0);
    }
    text
}

/// A positioned row of glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Bottom-left corner of the first glyph.
    pub origin: Point2,
    /// Glyphs, left to right.
    pub glyphs: Vec<Glyph>,
    /// Metrics.
    pub style: LabelStyle,
}

impl Label {
    /// Label for arbitrary text.
    pub fn new(origin: Point2, text: &str, style: LabelStyle) -> Self {
        Self {
            origin,
            glyphs: text.chars().map(Glyph::from_char).collect(),
            style,
        }
    }

    /// Label for a number formatted with [`format_value`].
    pub fn number(origin: Point2, value: f64, style: LabelStyle) -> Self {
        Self::new(origin, &format_value(value, style.no_leading_zeros), style)
    }

    /// Inked width, excluding the trailing gap.
    pub fn width(&self) -> f64 {
        let total: f64 = self
            .glyphs
            .iter()
            .map(|g| g.advance(self.style.seg_len, self.style.gap))
            .sum();
        if self.glyphs.is_empty() {
            0.0
        } else {
            total - self.style.gap
        }
    }

    /// Every stroke of the label, in drawing order.
    pub fn strokes(&self) -> Vec<(Point2, Point2)> {
        let mut x = self.origin.x;
        let mut out = Vec::new();
        for glyph in &self.glyphs {
            out.extend(glyph.strokes(Point2::new(x, self.origin.y), self.style.seg_len));
            x += glyph.advance(self.style.seg_len, self.style.gap);
        }
        out
    }

    /// Draw every stroke with a bead narrowed to [`STROKE_WIDTH_RATIO`].
    pub fn emit(&self, em: &mut Emitter, bead: Bead) {
        let bead = bead.with_width(bead.line_width * STROKE_WIDTH_RATIO);
        for (a, b) in self.strokes() {
            em.stroke(a, b, bead);
        }
    }
}

/// Draw `value` as a label starting at `origin`; returns the label width.
pub fn draw_number(
    em: &mut Emitter,
    origin: Point2,
    value: f64,
    style: LabelStyle,
    bead: Bead,
) -> f64 {
    let label = Label::number(origin, value, style);
    label.emit(em, bead);
    label.width()
}
