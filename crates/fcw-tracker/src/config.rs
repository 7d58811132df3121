//! Configuration for the collision guard

use crate::kalman::MAX_PATH_SAMPLES;
use crate::{TrackerError, TrackerResult};
use fcw_core::{Point2, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Configuration for the collision guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Tracking cadence, time between consecutive frames
    pub dt: f64,
    /// Objects farther than this from the origin are never dangerous
    pub safety_radius: f64,
    /// Future path horizon
    pub prediction_length: f64,
    /// Future path sampling step
    pub prediction_step: f64,
    /// Region a predicted path must avoid
    pub danger_zone: ZoneConfig,
    /// Own vehicle envelope
    pub vehicle: VehicleConfig,
    /// Per-object filter tuning
    pub filter: FilterConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            safety_radius: 25.0,
            prediction_length: 1.0,
            prediction_step: 0.1,
            danger_zone: ZoneConfig::default(),
            vehicle: VehicleConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Check every tunable, returning the first problem found
    pub fn validate(&self) -> TrackerResult<()> {
        positive("dt", self.dt)?;
        positive("safety_radius", self.safety_radius)?;
        positive("prediction_step", self.prediction_step)?;
        if !self.prediction_length.is_finite() || self.prediction_length < 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "prediction_length must be finite and non-negative, got {}",
                self.prediction_length
            )));
        }
        let steps = self.prediction_length / self.prediction_step;
        if !steps.is_finite() || steps > (MAX_PATH_SAMPLES - 1) as f64 {
            return Err(TrackerError::invalid_config(format!(
                "prediction_length / prediction_step must stay below {} samples, got {} / {}",
                MAX_PATH_SAMPLES, self.prediction_length, self.prediction_step
            )));
        }

        self.vehicle.validate()?;
        self.filter.validate()?;
        self.danger_zone.to_polygon()?;
        Ok(())
    }

    /// Settings tuned for a camera running at `fps` frames per second
    pub fn for_frame_rate(fps: f64) -> Self {
        Self {
            dt: 1.0 / fps,
            ..Default::default()
        }
    }
}

/// Danger zone shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneConfig {
    /// Arbitrary polygon
    Polygon { vertices: Vec<Point2> },
    /// Axis-aligned rectangle
    Rectangle { min: Point2, max: Point2 },
    /// Band of `half_width` around a segment
    Corridor {
        start: Point2,
        end: Point2,
        half_width: f64,
    },
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self::Rectangle {
            min: Point2::new(0.0, -1.5),
            max: Point2::new(20.0, 1.5),
        }
    }
}

impl ZoneConfig {
    pub fn to_polygon(&self) -> TrackerResult<Polygon> {
        let polygon = match self {
            Self::Polygon { vertices } => Polygon::new(vertices.clone())?,
            Self::Rectangle { min, max } => Polygon::rectangle(*min, *max)?,
            Self::Corridor {
                start,
                end,
                half_width,
            } => Polygon::corridor(*start, *end, *half_width)?,
        };
        Ok(polygon)
    }
}

/// Own vehicle envelope
///
/// The vehicle occupies `x ∈ [-length, 0]`, `y ∈ [-width/2, width/2]`;
/// the origin is the middle of the front bumper, so the footprint sits
/// behind the danger zone rather than centred on the origin. The buffered
/// footprint keeps square corners. It is reported for display only and
/// takes no part in the danger rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub length: f64,
    pub width: f64,
    /// Margin added on every side of the footprint
    pub buffer: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            length: 4.0,
            width: 1.8,
            buffer: 0.5,
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        positive("vehicle.length", self.length)?;
        positive("vehicle.width", self.width)?;
        if !self.buffer.is_finite() || self.buffer < 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "vehicle.buffer must be non-negative, got {}",
                self.buffer
            )));
        }
        Ok(())
    }

    /// Footprint expanded by the buffer margin
    pub fn footprint(&self) -> TrackerResult<Polygon> {
        let half_width = self.width / 2.0;
        let body = Rect::new(
            Point2::new(-self.length, -half_width),
            Point2::new(0.0, half_width),
        )?;
        Ok(body.buffered(self.buffer)?.to_polygon())
    }
}

/// Kalman filter tuning shared by every tracked object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Prior variances for `[x, vx, ax, y, vy, ay]` before scaling
    pub initial_covariance: [f64; 6],
    pub initial_covariance_scale: f64,
    /// Variance of the white-noise acceleration change
    pub process_noise_variance: f64,
    /// One-sigma localisation error per axis
    pub measurement_std: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            initial_covariance: [1.0, 2.0, 4.0, 1.0, 2.0, 4.0],
            initial_covariance_scale: 0.5,
            process_noise_variance: 0.01,
            measurement_std: 2.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        for (i, v) in self.initial_covariance.iter().enumerate() {
            positive(&format!("filter.initial_covariance[{}]", i), *v)?;
        }
        positive("filter.initial_covariance_scale", self.initial_covariance_scale)?;
        positive("filter.process_noise_variance", self.process_noise_variance)?;
        positive("filter.measurement_std", self.measurement_std)?;
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> TrackerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::invalid_config(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}
