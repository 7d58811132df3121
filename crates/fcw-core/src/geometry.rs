//! Planar geometry for danger-zone reasoning
//!
//! Everything here lives on the ground plane in vehicle coordinates:
//! x points forward, y points left, the origin is the vehicle's front
//! reference point.

use crate::{CoreError, CoreResult, Point2};
use serde::{Deserialize, Serialize};

/// Tolerance for orientation tests
const ORIENTATION_EPS: f64 = 1e-12;

// ============================================================================
// POLYLINE
// ============================================================================

/// Ordered sequence of ground points, e.g. a predicted future path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<Point2>,
}

impl Polyline {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point2> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point2> {
        self.points.last()
    }

    /// Consecutive point pairs
    pub fn segments(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    /// Total arc length
    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance_to(&b)).sum()
    }
}

impl From<Vec<Point2>> for Polyline {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

// ============================================================================
// RECTANGLE
// ============================================================================

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Rect {
    pub fn new(min: Point2, max: Point2) -> CoreResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(CoreError::invalid_geometry("rectangle corners must be finite"));
        }
        if max.x <= min.x || max.y <= min.y {
            return Err(CoreError::invalid_geometry(format!(
                "rectangle max {} must exceed min {}",
                max, min
            )));
        }
        Ok(Self { min, max })
    }

    /// Grow the rectangle by `margin` on every side
    pub fn buffered(&self, margin: f64) -> CoreResult<Self> {
        let offset = Point2::new(margin, margin);
        Self::new(self.min - offset, self.max + offset)
    }

    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Counter-clockwise polygon with the same outline
    pub fn to_polygon(&self) -> Polygon {
        Polygon {
            vertices: vec![
                self.min,
                Point2::new(self.max.x, self.min.y),
                self.max,
                Point2::new(self.min.x, self.max.y),
            ],
        }
    }
}

// ============================================================================
// POLYGON
// ============================================================================

/// Simple polygon given by its vertices; the closing edge is implicit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point2>,
}

impl Polygon {
    /// Create a polygon, rejecting fewer than three vertices, non-finite
    /// coordinates and zero area
    pub fn new(vertices: Vec<Point2>) -> CoreResult<Self> {
        if vertices.len() < 3 {
            return Err(CoreError::invalid_polygon(format!(
                "need at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if let Some(bad) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(CoreError::invalid_polygon(format!("non-finite vertex {:?}", bad)));
        }

        let polygon = Self { vertices };
        if polygon.area() <= ORIENTATION_EPS {
            return Err(CoreError::invalid_polygon("polygon has zero area"));
        }
        Ok(polygon)
    }

    /// Axis-aligned rectangle from two opposite corners
    pub fn rectangle(min: Point2, max: Point2) -> CoreResult<Self> {
        Ok(Rect::new(min, max)?.to_polygon())
    }

    /// Flat-capped band of `half_width` around the segment `start -> end`
    pub fn corridor(start: Point2, end: Point2, half_width: f64) -> CoreResult<Self> {
        let along = end - start;
        let length = along.norm();
        if !length.is_finite() || length <= 0.0 {
            return Err(CoreError::invalid_geometry("corridor needs two distinct end points"));
        }
        if !half_width.is_finite() || half_width <= 0.0 {
            return Err(CoreError::invalid_geometry(format!(
                "corridor half width must be positive, got {}",
                half_width
            )));
        }

        let dir = along * (1.0 / length);
        let normal = Point2::new(-dir.y, dir.x) * half_width;
        Self::new(vec![start - normal, end - normal, end + normal, start + normal])
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    /// Polygon edges including the closing one
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Unsigned area (shoelace formula)
    pub fn area(&self) -> f64 {
        self.edges().map(|(a, b)| a.cross(&b)).sum::<f64>().abs() / 2.0
    }

    /// Point-in-polygon test using ray casting
    pub fn contains(&self, point: &Point2) -> bool {
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;

        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];

            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Whether `point` lies on one of the edges
    pub fn touches(&self, point: &Point2) -> bool {
        self.edges().any(|(a, b)| segments_intersect(*point, *point, a, b))
    }

    /// Whether the polyline shares at least one point with the polygon,
    /// boundary included
    pub fn intersects(&self, path: &Polyline) -> bool {
        if path.points().iter().any(|p| self.contains(p) || self.touches(p)) {
            return true;
        }

        path.segments()
            .any(|(p1, p2)| self.edges().any(|(q1, q2)| segments_intersect(p1, p2, q1, q2)))
    }

    /// Axis-aligned bounds
    pub fn bounds(&self) -> Rect {
        let min_x = self.vertices.iter().map(|v| v.x).fold(f64::MAX, f64::min);
        let max_x = self.vertices.iter().map(|v| v.x).fold(f64::MIN, f64::max);
        let min_y = self.vertices.iter().map(|v| v.y).fold(f64::MAX, f64::min);
        let max_y = self.vertices.iter().map(|v| v.y).fold(f64::MIN, f64::max);

        Rect {
            min: Point2::new(min_x, min_y),
            max: Point2::new(max_x, max_y),
        }
    }
}

/// Sign of the turn `a -> b -> c`: positive counter-clockwise, zero collinear
fn orientation(a: Point2, b: Point2, c: Point2) -> f64 {
    (b - a).cross(&(c - a))
}

/// Whether `p` lies within the bounding box of segment `a-b`
fn within_box(a: Point2, b: Point2, p: Point2) -> bool {
    p.x >= a.x.min(b.x) - ORIENTATION_EPS
        && p.x <= a.x.max(b.x) + ORIENTATION_EPS
        && p.y >= a.y.min(b.y) - ORIENTATION_EPS
        && p.y <= a.y.max(b.y) + ORIENTATION_EPS
}

/// Closed segment intersection test, touching and collinear overlap count
pub fn segments_intersect(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    let straddles_q = (d1 > ORIENTATION_EPS && d2 < -ORIENTATION_EPS)
        || (d1 < -ORIENTATION_EPS && d2 > ORIENTATION_EPS);
    let straddles_p = (d3 > ORIENTATION_EPS && d4 < -ORIENTATION_EPS)
        || (d3 < -ORIENTATION_EPS && d4 > ORIENTATION_EPS);
    if straddles_q && straddles_p {
        return true;
    }

    (d1.abs() <= ORIENTATION_EPS && within_box(q1, q2, p1))
        || (d2.abs() <= ORIENTATION_EPS && within_box(q1, q2, p2))
        || (d3.abs() <= ORIENTATION_EPS && within_box(p1, p2, q1))
        || (d4.abs() <= ORIENTATION_EPS && within_box(p1, p2, q2))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lane() -> Polygon {
        Polygon::rectangle(Point2::new(0.0, -1.5), Point2::new(20.0, 1.5)).unwrap()
    }

    fn path(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&p| Point2::from(p)).collect())
    }

    #[test]
    fn test_polygon_validation() {
        assert!(Polygon::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]).is_err());
        assert!(
            Polygon::new(vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
            ])
            .is_err()
        );
        assert!(Polygon::rectangle(Point2::new(1.0, 1.0), Point2::new(0.0, 2.0)).is_err());
        assert_abs_diff_eq!(lane().area(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_contains() {
        let zone = lane();
        assert!(zone.contains(&Point2::new(10.0, 0.0)));
        assert!(!zone.contains(&Point2::new(10.0, 2.0)));
        assert!(!zone.contains(&Point2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_path_crossing_boundary() {
        let zone = lane();
        assert!(zone.intersects(&path(&[(10.0, 5.0), (10.0, 0.5), (10.0, -5.0)])));
        assert!(zone.intersects(&path(&[(10.0, 5.0), (10.0, -5.0)])));
    }

    #[test]
    fn test_path_outside() {
        let zone = lane();
        assert!(!zone.intersects(&path(&[(10.0, 5.0), (10.0, 8.0), (10.0, 12.0)])));
        assert!(!zone.intersects(&path(&[(25.0, 5.0), (25.0, -5.0)])));
    }

    #[test]
    fn test_path_fully_inside() {
        let zone = lane();
        assert!(zone.intersects(&path(&[(5.0, 0.0), (6.0, 0.0)])));
        assert!(zone.intersects(&path(&[(5.0, 0.0)])));
    }

    #[test]
    fn test_path_along_edge() {
        // Collinear with the left edge of the zone
        let zone = lane();
        assert!(zone.intersects(&path(&[(0.0, 6.9), (0.0, -10.0)])));
        assert!(zone.intersects(&path(&[(0.0, 1.5)])));
        assert!(!zone.intersects(&path(&[(0.0, 6.9), (0.0, 2.0)])));
    }

    #[test]
    fn test_corridor() {
        let corridor =
            Polygon::corridor(Point2::new(0.0, 0.0), Point2::new(15.0, 0.0), 3.0).unwrap();
        assert_abs_diff_eq!(corridor.area(), 90.0, epsilon = 1e-9);
        assert!(corridor.contains(&Point2::new(7.0, 2.5)));
        assert!(!corridor.contains(&Point2::new(16.0, 0.0)));

        let bounds = corridor.bounds();
        assert_abs_diff_eq!(bounds.min.y, -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.max.x, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rect_buffer() {
        let vehicle = Rect::new(Point2::new(-4.0, -0.9), Point2::new(0.0, 0.9)).unwrap();
        let zone = vehicle.buffered(0.5).unwrap();
        assert_abs_diff_eq!(zone.width(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(zone.height(), 2.8, epsilon = 1e-12);
        assert!(zone.contains(&Point2::new(0.4, 0.0)));
        assert_eq!(zone.to_polygon().vertices().len(), 4);
    }

    #[test]
    fn test_polyline_length() {
        let line = path(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert_eq!(line.len(), 3);
        assert_eq!(line.segments().count(), 2);
        assert_abs_diff_eq!(line.length(), 11.0, epsilon = 1e-12);
        assert_eq!(line.last(), Some(&Point2::new(3.0, 10.0)));
    }
}
