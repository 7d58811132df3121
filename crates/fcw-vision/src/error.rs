//! Error types for the vision module

use thiserror::Error;

/// Errors that can occur while building cameras or projecting detections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Camera calibration error: {0}")]
    InvalidCalibration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ray is parallel to the ground plane (n·S = {denominator:e})")]
    DegenerateProjection { denominator: f64 },

    #[error("Ground intersection lies behind the camera (ray parameter {ray_parameter:.3})")]
    BehindCamera { ray_parameter: f64 },

    #[error("Projection produced a non-finite point")]
    NonFinite,

    #[error("Ground point at {range:.1} exceeds maximum range {max_range:.1}")]
    OutOfRange { range: f64, max_range: f64 },
}

impl VisionError {
    pub fn singular_matrix(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    pub fn invalid_calibration(msg: impl Into<String>) -> Self {
        Self::InvalidCalibration(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Short label used for drop logs, projector stats and metric labels
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SingularMatrix(_) => "singular_matrix",
            Self::InvalidCalibration(_) => "invalid_calibration",
            Self::InvalidConfig(_) => "invalid_config",
            Self::DegenerateProjection { .. } => "parallel_ray",
            Self::BehindCamera { .. } => "behind_camera",
            Self::NonFinite => "non_finite",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}

pub type VisionResult<T> = Result<T, VisionError>;
