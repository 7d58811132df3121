//! Configuration for the vision module

use crate::camera::{intrinsic_matrix, mount_extrinsic};
use crate::{Distortion, PinholeCamera, VisionError, VisionResult};
use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};

/// Reference-point projector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Rays whose vertical component is below this are treated as
    /// parallel to the ground
    pub parallel_epsilon: f64,
    /// Drop ground points farther than this from the origin
    pub max_ground_range: Option<f64>,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            parallel_epsilon: 1e-9,
            max_ground_range: None,
        }
    }
}

impl ProjectorConfig {
    pub fn validate(&self) -> VisionResult<()> {
        if !self.parallel_epsilon.is_finite() || self.parallel_epsilon <= 0.0 {
            return Err(VisionError::invalid_config(format!(
                "parallel_epsilon must be positive, got {}",
                self.parallel_epsilon
            )));
        }
        if let Some(range) = self.max_ground_range {
            if range.is_nan() || range <= 0.0 {
                return Err(VisionError::invalid_config(format!(
                    "max_ground_range must be positive, got {}",
                    range
                )));
            }
        }
        Ok(())
    }
}

/// Camera pose relative to the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtrinsicConfig {
    /// Explicit world-to-camera matrix, row major
    Matrix { rt: [[f64; 4]; 4] },
    /// Forward-looking camera above the vehicle reference point
    Mount {
        height: f64,
        #[serde(default)]
        pitch_deg: f64,
        #[serde(default)]
        lateral_offset: f64,
    },
}

impl ExtrinsicConfig {
    pub fn to_matrix(&self) -> Matrix4<f64> {
        match self {
            Self::Matrix { rt } => Matrix4::from_fn(|r, c| rt[r][c]),
            Self::Mount {
                height,
                pitch_deg,
                lateral_offset,
            } => mount_extrinsic(*height, *pitch_deg, *lateral_offset),
        }
    }
}

/// Calibration data for building a [`PinholeCamera`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Raw image intrinsics, row major
    pub k: [[f64; 3]; 3],
    /// Rectified intrinsics; defaults to `k`
    #[serde(default)]
    pub k_new: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub distortion: Distortion,
    pub extrinsic: ExtrinsicConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let k = intrinsic_matrix(1000.0, 1000.0, 640.0, 360.0);
        Self {
            k: rows3(&k),
            k_new: None,
            distortion: Distortion::none(),
            extrinsic: ExtrinsicConfig::Mount {
                height: 1.4,
                pitch_deg: 2.0,
                lateral_offset: 0.0,
            },
        }
    }
}

impl CameraConfig {
    /// Build the camera, failing on singular matrices
    pub fn build(&self) -> VisionResult<PinholeCamera> {
        let k = Matrix3::from_fn(|r, c| self.k[r][c]);
        let k_new = self
            .k_new
            .map(|rows| Matrix3::from_fn(|r, c| rows[r][c]))
            .unwrap_or(k);
        PinholeCamera::new(k, k_new, self.distortion, self.extrinsic.to_matrix())
    }
}

fn rows3(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CameraModel;

    #[test]
    fn test_default_camera_builds() {
        let camera = CameraConfig::default().build().unwrap();
        assert_eq!(camera.k(), camera.k_new());
        assert!((camera.center().z - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_camera_from_json() {
        let json = r#"{
            "k": [[800, 0, 320], [0, 800, 240], [0, 0, 1]],
            "distortion": [-0.2, 0.05, 0, 0, 0],
            "extrinsic": {"type": "mount", "height": 1.2, "pitch_deg": 3.0}
        }"#;
        let config: CameraConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.distortion.k1, -0.2);

        let camera = config.build().unwrap();
        assert_eq!(camera.k()[(0, 2)], 320.0);
    }

    #[test]
    fn test_singular_k_new_fails_fast() {
        let config = CameraConfig {
            k_new: Some([[0.0; 3]; 3]),
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(VisionError::SingularMatrix(_))));
    }

    #[test]
    fn test_projector_config_validation() {
        assert!(ProjectorConfig::default().validate().is_ok());

        let bad = ProjectorConfig {
            parallel_epsilon: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ProjectorConfig {
            max_ground_range: Some(-1.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
