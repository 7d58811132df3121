//! # FCW Vision - Camera Geometry
//!
//! Turns 2D detections from the upstream image tracker into 3D ground
//! points in vehicle coordinates.
//! Features:
//! - Pinhole camera with cached inverse intrinsics/extrinsics
//! - Brown-Conrady distortion removal for raw detections
//! - Bottom-mid reference points intersected with the ground plane
//!
//! ## Projection
//!
//! For every detection the projector:
//! 1. Takes the bottom-mid pixel of the bounding box
//! 2. Rectifies it unless the tracker already works on rectified frames
//! 3. Back-projects it through `K_new⁻¹` and `RT⁻¹` into a world ray
//! 4. Intersects the ray with `z = 0`, dropping rays that never reach
//!    the ground in front of the camera

pub mod camera;
pub mod config;
pub mod error;
pub mod projector;

pub use camera::{CameraModel, Distortion, PinholeCamera, intrinsic_matrix, mount_extrinsic};
pub use config::{CameraConfig, ExtrinsicConfig, ProjectorConfig};
pub use error::{VisionError, VisionResult};
pub use projector::{ProjectionStats, ReferencePointProjector};
