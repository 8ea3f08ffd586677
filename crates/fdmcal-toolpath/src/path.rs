//! Path types: closed loops, open polylines, and their extents.

/// A point in the bed plane (mm).
pub type Point2 = nalgebra::Point2<f64>;

/// A 2D polygon (closed path).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices of the polygon in order.
    pub points: Vec<Point2>,
}

impl Polygon {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise from the min corner.
    pub fn rectangle(min: Point2, max: Point2) -> Self {
        Self::new(vec![
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// An open polyline (non-closed path).
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Points along the path.
    pub points: Vec<Point2>,
}

impl Polyline {
    /// Create a new polyline.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Starting point.
    pub fn start(&self) -> Option<&Point2> {
        self.points.first()
    }
}

/// Axis-aligned extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point2,
    /// Maximum corner.
    pub max: Point2,
}

impl BoundingBox {
    /// Box with its min corner at `origin`.
    pub fn from_origin(origin: Point2, width: f64, height: f64) -> Self {
        Self {
            min: origin,
            max: Point2::new(origin.x + width, origin.y + height),
        }
    }

    /// Tightest box around `points`, `None` if there are none.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |b, p| b.include(*p)))
    }

    /// Grow to contain `p`.
    pub fn include(self, p: Point2) -> Self {
        Self {
            min: Point2::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point2::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    /// Extent in X.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent in Y.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Is the box inside `[0, bed_x] × [0, bed_y]`?
    pub fn fits_bed(&self, bed_x: f64, bed_y: f64) -> bool {
        self.min.x >= 0.0 && self.min.y >= 0.0 && self.max.x <= bed_x && self.max.y <= bed_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_winding() {
        let r = Polygon::rectangle(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0));
        assert_eq!(r.len(), 4);
        assert_eq!(r.points[1], Point2::new(2.0, 0.0));
        assert_eq!(r.points[3], Point2::new(0.0, 1.0));
    }

    #[test]
    fn test_bounding_box() {
        let pts = [
            Point2::new(1.0, 5.0),
            Point2::new(-2.0, 3.0),
            Point2::new(4.0, -1.0),
        ];
        let b = BoundingBox::of_points(&pts).unwrap();
        assert_eq!(b.min, Point2::new(-2.0, -1.0));
        assert_eq!(b.max, Point2::new(4.0, 5.0));
        assert_relative_eq!(b.width(), 6.0);
        assert!(!b.fits_bed(10.0, 10.0));
        assert!(BoundingBox::of_points(&Vec::<Point2>::new()).is_none());
    }

    #[test]
    fn test_from_origin() {
        let b = BoundingBox::from_origin(Point2::new(10.0, 20.0), 30.0, 5.0);
        assert_relative_eq!(b.height(), 5.0);
        assert!(b.fits_bed(40.0, 25.0));
        assert!(!b.fits_bed(39.9, 25.0));
    }
}
