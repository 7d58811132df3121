//! Image-to-ground projection of detection reference points
//!
//! Each bounding box is reduced to its bottom-mid pixel, turned into a
//! viewing ray through the rectified intrinsics and intersected with the
//! flat ground plane `z = 0`.

use crate::{CameraModel, ProjectorConfig, VisionError, VisionResult};
use fcw_core::{ImageBox, Point2, Point3, TrackId};
use nalgebra::{Vector3, Vector4};
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};

/// Running counters of the projector
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectionStats {
    pub frames_processed: u64,
    pub detections_received: u64,
    pub points_projected: u64,
    /// Dropped detections keyed by [`VisionError::reason`]
    drops: BTreeMap<&'static str, u64>,
}

impl ProjectionStats {
    /// Total detections dropped for any reason
    pub fn dropped(&self) -> u64 {
        self.drops.values().sum()
    }

    /// Detections dropped with the given reason label
    pub fn dropped_for(&self, reason: &str) -> u64 {
        self.drops.get(reason).copied().unwrap_or(0)
    }

    /// Drop counts per reason label, in label order
    pub fn drops(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.drops.iter().map(|(reason, count)| (*reason, *count))
    }

    pub fn record_drop(&mut self, err: &VisionError) {
        *self.drops.entry(err.reason()).or_default() += 1;
    }
}

/// Converts per-identity image detections into ground-plane world points
pub struct ReferencePointProjector<C: CameraModel> {
    camera: C,
    config: ProjectorConfig,
    stats: ProjectionStats,
}

impl<C: CameraModel> ReferencePointProjector<C> {
    /// Create a projector for a calibrated camera
    pub fn new(camera: C, config: ProjectorConfig) -> VisionResult<Self> {
        config.validate()?;
        Ok(Self {
            camera,
            config,
            stats: ProjectionStats::default(),
        })
    }

    /// Project one frame of detections to world points
    ///
    /// Output keys are the input identities; detections whose ray cannot
    /// be intersected with the ground are dropped with a warning.
    /// `rectified` states whether box coordinates are already undistorted.
    pub fn project(
        &mut self,
        detections: &HashMap<TrackId, ImageBox>,
        rectified: bool,
    ) -> HashMap<TrackId, Point3> {
        self.stats.frames_processed += 1;
        if detections.is_empty() {
            return HashMap::new();
        }
        self.stats.detections_received += detections.len() as u64;

        let (ids, pixels): (Vec<TrackId>, Vec<Point2>) = detections
            .iter()
            .map(|(id, bbox)| (*id, bbox.reference_point()))
            .unzip();

        let pixels = if rectified {
            pixels
        } else {
            self.camera.rectify_points(&pixels)
        };

        let mut points = HashMap::with_capacity(ids.len());
        for (id, pixel) in ids.into_iter().zip(pixels) {
            match self.ground_point(pixel) {
                Ok(point) => {
                    trace!(
                        "Track {} pixel {} -> ground ({:.2}, {:.2})",
                        id,
                        pixel,
                        point.x,
                        point.y
                    );
                    points.insert(id, point);
                }
                Err(err) => {
                    warn!(
                        "Dropping detection {} at pixel {} ({}): {}",
                        id,
                        pixel,
                        err.reason(),
                        err
                    );
                    self.stats.record_drop(&err);
                }
            }
        }

        self.stats.points_projected += points.len() as u64;
        points
    }

    /// Intersect the viewing ray of a rectified pixel with the ground plane
    pub fn ground_point(&self, pixel: Point2) -> VisionResult<Point3> {
        if !pixel.is_finite() {
            return Err(VisionError::NonFinite);
        }

        let ray = self.camera.k_new_inv() * Vector3::new(pixel.x, pixel.y, 1.0);
        let rt_inv = self.camera.rt_inv();
        let origin = (rt_inv * Vector4::new(0.0, 0.0, 0.0, 1.0)).xyz();
        let target = (rt_inv * Vector4::new(ray.x, ray.y, ray.z, 1.0)).xyz();
        let direction = target - origin;

        // Ground plane normal is (0, 0, 1)
        let denominator = direction.z;
        if !denominator.is_finite() || denominator.abs() < self.config.parallel_epsilon {
            return Err(VisionError::DegenerateProjection { denominator });
        }

        let t = origin.z / denominator;
        // Ray points are origin + s * direction; the ground hit is at s = -t
        if -t <= 0.0 {
            return Err(VisionError::BehindCamera { ray_parameter: -t });
        }

        let ground = origin - direction * t;
        let point = Point3::new(ground.x, ground.y, ground.z);
        if !point.is_finite() {
            return Err(VisionError::NonFinite);
        }

        if let Some(max_range) = self.config.max_ground_range {
            let range = point.xy().norm();
            if range > max_range {
                return Err(VisionError::OutOfRange { range, max_range });
            }
        }

        Ok(point)
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn stats(&self) -> &ProjectionStats {
        &self.stats
    }
}

// ============================================================================
// TESTS
// ============================================================================
