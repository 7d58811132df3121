//! Error types for the tracker

use fcw_core::CoreError;
use thiserror::Error;

/// Errors raised while building a collision guard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Zone geometry error: {0}")]
    Geometry(#[from] CoreError),
}

impl TrackerError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
