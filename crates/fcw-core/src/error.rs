//! Error types for the shared geometry layer

use thiserror::Error;

/// Core error type for geometry and detection primitives
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl CoreError {
    pub fn invalid_polygon(msg: impl Into<String>) -> Self {
        Self::InvalidPolygon(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
