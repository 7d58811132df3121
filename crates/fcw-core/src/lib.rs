//! # FCW Core
//!
//! Shared domain types for the forward collision guard.
//! This crate provides the primitives passed between the projector,
//! the tracker and the replay tooling:
//! - Tracking identities and image-space bounding boxes
//! - World-space points in vehicle coordinates (x forward, y left, z up)
//! - Polylines and polygons used for danger-zone reasoning

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

pub mod error;
pub mod geometry;

pub use error::{CoreError, CoreResult};
pub use geometry::*;

// ============================================================================
// IDENTITIES
// ============================================================================

/// Tracking identity assigned by the upstream image tracker.
///
/// Unique within a frame and stable across frames for the same physical
/// object. The guard never re-validates uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl TrackId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// IMAGE SPACE
// ============================================================================

/// Axis-aligned bounding box in image pixels, `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct ImageBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl ImageBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Bottom-mid pixel of the box, the approximate ground contact point
    pub fn reference_point(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, self.y2)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

impl From<[f64; 4]> for ImageBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<ImageBox> for [f64; 4] {
    fn from(b: ImageBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ============================================================================
// WORLD SPACE
// ============================================================================

/// 2D point, used both for pixels and for ground-plane coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// Euclidean norm, i.e. the distance from the coordinate origin
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (*other - *self).norm()
    }

    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product
    pub fn cross(&self, other: &Point2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// 3D world point; ground-plane projections carry `z ≈ 0`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane point at `z = 0`
    pub fn on_ground(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    /// Drop the height component
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

impl From<Point2> for Point3 {
    fn from(p: Point2) -> Self {
        Self::on_ground(p.x, p.y)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_reference_point_is_bottom_mid() {
        let bbox = ImageBox::new(100.0, 50.0, 140.0, 210.0);
        let rp = bbox.reference_point();
        assert_eq!(rp, Point2::new(120.0, 210.0));
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 160.0);
    }

    #[test]
    fn test_detections_from_json() {
        let json = r#"{"3": [10.0, 20.0, 30.0, 60.0], "7": [0, 0, 4, 4]}"#;
        let detections: HashMap<TrackId, ImageBox> = serde_json::from_str(json).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[&TrackId(3)], ImageBox::new(10.0, 20.0, 30.0, 60.0));
        assert_eq!(detections[&TrackId(7)].reference_point(), Point2::new(2.0, 4.0));
    }

    #[test]
    fn test_point_serializes_as_array() {
        let json = serde_json::to_string(&Point2::new(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");

        let p: Point3 = serde_json::from_str("[1.0, 2.0, 0.0]").unwrap();
        assert_eq!(p.xy(), Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_point_arithmetic() {
        let a = Point2::new(3.0, 4.0);
        assert_eq!(a.norm(), 5.0);
        assert_eq!(a - Point2::new(1.0, 1.0), Point2::new(2.0, 3.0));
        assert_eq!(a * 2.0, Point2::new(6.0, 8.0));
        assert_eq!(a.cross(&Point2::new(1.0, 0.0)), -4.0);
        assert!(!Point2::new(f64::NAN, 0.0).is_finite());
    }
}
