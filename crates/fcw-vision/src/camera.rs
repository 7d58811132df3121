//! Pinhole camera model with Brown-Conrady lens distortion
//!
//! Conventions: camera frame has x right, y down, z along the optical
//! axis. `RT` maps homogeneous world points into the camera frame.

use crate::{VisionError, VisionResult};
use fcw_core::{Point2, Point3};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed-point iterations used to invert the distortion model
const UNDISTORT_ITERATIONS: usize = 20;

/// Tolerance for the homogeneous bottom row of `RT`
const EXTRINSIC_TOLERANCE: f64 = 1e-9;

/// Lens distortion coefficients `(k1, k2, p1, p2, k3)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    /// No distortion
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        *self == Self::default()
    }

    /// Apply distortion to normalized image coordinates
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let radial = 1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2;
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (x * radial + dx, y * radial + dy)
    }

    /// Remove distortion from normalized image coordinates
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        if self.is_none() {
            return (xd, yd);
        }

        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let inv_radial = 1.0 / (1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2);
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (xd - dx) * inv_radial;
            y = (yd - dy) * inv_radial;
        }
        (x, y)
    }
}

impl From<[f64; 5]> for Distortion {
    fn from(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }
}

impl From<Distortion> for [f64; 5] {
    fn from(d: Distortion) -> Self {
        [d.k1, d.k2, d.p1, d.p2, d.k3]
    }
}

/// Read-only view of a calibrated camera
///
/// Implemented by [`PinholeCamera`]; the projector only depends on this
/// trait so calibration sources can be swapped.
#[cfg_attr(test, mockall::automock)]
pub trait CameraModel {
    /// Intrinsic matrix of the raw (distorted) image
    fn k(&self) -> Matrix3<f64>;

    /// Intrinsic matrix of the rectified image
    fn k_new(&self) -> Matrix3<f64>;

    /// Cached inverse of `k_new`
    fn k_new_inv(&self) -> Matrix3<f64>;

    fn distortion(&self) -> Distortion;

    /// World-to-camera transform
    fn rt(&self) -> Matrix4<f64>;

    /// Cached camera-to-world transform
    fn rt_inv(&self) -> Matrix4<f64>;

    /// Map raw pixels to rectified pixels
    fn rectify_points(&self, points: &[Point2]) -> Vec<Point2>;
}

/// Pinhole camera with cached inverses
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
    k_new: Matrix3<f64>,
    k_new_inv: Matrix3<f64>,
    distortion: Distortion,
    rt: Matrix4<f64>,
    rt_inv: Matrix4<f64>,
}

impl PinholeCamera {
    /// Create a camera, failing on non-invertible `K`, `K_new` or `RT`
    pub fn new(
        k: Matrix3<f64>,
        k_new: Matrix3<f64>,
        distortion: Distortion,
        rt: Matrix4<f64>,
    ) -> VisionResult<Self> {
        if k.iter().chain(k_new.iter()).chain(rt.iter()).any(|v| !v.is_finite()) {
            return Err(VisionError::invalid_calibration("camera matrices must be finite"));
        }

        let bottom = rt.row(3);
        let expected = [0.0, 0.0, 0.0, 1.0];
        if bottom.iter().zip(expected).any(|(a, b)| (a - b).abs() > EXTRINSIC_TOLERANCE) {
            return Err(VisionError::invalid_calibration(format!(
                "extrinsic bottom row must be [0, 0, 0, 1], got {}",
                bottom
            )));
        }

        let k_inv = k
            .try_inverse()
            .ok_or_else(|| VisionError::singular_matrix("intrinsic matrix K"))?;
        let k_new_inv = k_new
            .try_inverse()
            .ok_or_else(|| VisionError::singular_matrix("rectified intrinsic matrix K_new"))?;
        let rt_inv = rt
            .try_inverse()
            .ok_or_else(|| VisionError::singular_matrix("extrinsic matrix RT"))?;

        debug!(
            "Camera created, centre at ({:.3}, {:.3}, {:.3})",
            rt_inv[(0, 3)],
            rt_inv[(1, 3)],
            rt_inv[(2, 3)]
        );

        Ok(Self {
            k,
            k_inv,
            k_new,
            k_new_inv,
            distortion,
            rt,
            rt_inv,
        })
    }

    /// Distortion-free camera whose rectified intrinsics equal `K`
    pub fn ideal(k: Matrix3<f64>, rt: Matrix4<f64>) -> VisionResult<Self> {
        Self::new(k, k, Distortion::none(), rt)
    }

    /// Camera centre in world coordinates
    pub fn center(&self) -> Point3 {
        let c = self.rt_inv.column(3);
        Point3::new(c[0], c[1], c[2])
    }

    /// Project a world point to rectified pixels, `None` if it is not in
    /// front of the camera
    pub fn project(&self, world: &Point3) -> Option<Point2> {
        let (x, y) = self.normalized(world)?;
        Some(apply_intrinsics(&self.k_new, x, y))
    }

    /// Project a world point to raw (distorted) pixels
    pub fn project_distorted(&self, world: &Point3) -> Option<Point2> {
        let (x, y) = self.normalized(world)?;
        let (xd, yd) = self.distortion.distort(x, y);
        Some(apply_intrinsics(&self.k, xd, yd))
    }

    fn normalized(&self, world: &Point3) -> Option<(f64, f64)> {
        let pc = self.rt * Vector4::new(world.x, world.y, world.z, 1.0);
        if pc.z <= 0.0 {
            return None;
        }
        Some((pc.x / pc.z, pc.y / pc.z))
    }
}

impl CameraModel for PinholeCamera {
    fn k(&self) -> Matrix3<f64> {
        self.k
    }

    fn k_new(&self) -> Matrix3<f64> {
        self.k_new
    }

    fn k_new_inv(&self) -> Matrix3<f64> {
        self.k_new_inv
    }

    fn distortion(&self) -> Distortion {
        self.distortion
    }

    fn rt(&self) -> Matrix4<f64> {
        self.rt
    }

    fn rt_inv(&self) -> Matrix4<f64> {
        self.rt_inv
    }

    fn rectify_points(&self, points: &[Point2]) -> Vec<Point2> {
        points
            .iter()
            .map(|p| {
                let n = self.k_inv * Vector3::new(p.x, p.y, 1.0);
                let (x, y) = self.distortion.undistort(n.x / n.z, n.y / n.z);
                apply_intrinsics(&self.k_new, x, y)
            })
            .collect()
    }
}

fn apply_intrinsics(k: &Matrix3<f64>, x: f64, y: f64) -> Point2 {
    let p = k * Vector3::new(x, y, 1.0);
    Point2::new(p.x / p.z, p.y / p.z)
}

/// Intrinsic matrix from focal lengths and principal point
pub fn intrinsic_matrix(fx: f64, fy: f64, cx: f64, cy: f64) -> Matrix3<f64> {
    Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0)
}

/// World-to-camera transform for a forward-looking camera mounted on the
/// vehicle
///
/// World frame: x forward, y left, z up, origin on the ground at the
/// vehicle reference point. `pitch_deg` tilts the optical axis towards
/// the ground.
pub fn mount_extrinsic(height: f64, pitch_deg: f64, lateral_offset: f64) -> Matrix4<f64> {
    let (s, c) = pitch_deg.to_radians().sin_cos();

    // Rows are the camera axes expressed in world coordinates
    let r = Matrix3::new(
        0.0, -1.0, 0.0, //
        -s, 0.0, -c, //
        c, 0.0, -s,
    );
    let t = -(r * Vector3::new(0.0, lateral_offset, height));

    let mut rt = Matrix4::identity();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    rt.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
    rt
}

// ============================================================================
// TESTS
// ============================================================================
