//! # FCW Tracker - Object State Estimation & Collision Guard
//!
//! Turns per-frame ground points into filtered object tracks and decides
//! which of them threaten the vehicle.
//! Features:
//! - Constant-acceleration Kalman filter per tracking identity
//! - Deterministic future path roll-out
//! - Danger zone crossing and safety radius checks
//!
//! ## Frame cycle
//!
//! ```text
//! world points ──► CollisionGuard::update ──► TrackedObject::update
//!                                                   │
//! dangerous_objects ◄── future_path ∩ danger zone ◄─┘
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod kalman;
pub mod motion;

pub use config::{FilterConfig, GuardConfig, VehicleConfig, ZoneConfig};
pub use error::{TrackerError, TrackerResult};
pub use guard::{CollisionGuard, DangerousObject, GuardStats, TrackChanges};
pub use kalman::{MAX_PATH_SAMPLES, TrackedObject};
