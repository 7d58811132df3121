//! Kalman filtering of a single object's ground-plane motion
//!
//! Each tracked object carries a constant-acceleration filter over
//! `[x, vx, ax, y, vy, ay]` that observes position only. The filter also
//! rolls its current estimate forward to produce a deterministic future
//! path for danger checks.

use crate::FilterConfig;
use crate::motion::{
    MEASUREMENT_SIZE, STATE_SIZE, VX, VY, X, Y, measurement_matrix, motion_model, process_noise,
};
use fcw_core::{Point2, Polyline};
use nalgebra::{Matrix2, Matrix2x6, Matrix6, SMatrix, Vector2, Vector6};
use tracing::{trace, warn};

/// Tolerance used when converting a horizon into a whole number of steps
const STEP_COUNT_EPS: f64 = 1e-9;

/// Upper bound on the number of samples in a future path
pub const MAX_PATH_SAMPLES: usize = 10_000;

/// Filter state of one tracked object
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// State vector [x, vx, ax, y, vy, ay]
    state: Vector6<f64>,
    /// Estimation covariance
    covariance: Matrix6<f64>,
    /// State transition for one tracking step
    transition: Matrix6<f64>,
    /// Observation matrix, selects (x, y)
    observation: Matrix2x6<f64>,
    /// Process noise covariance
    process_noise: Matrix6<f64>,
    /// Measurement noise covariance
    measurement_noise: Matrix2<f64>,
    /// Tracking time step
    dt: f64,
    /// Position after the last correction
    location: Option<Point2>,
    /// Velocity after the last correction
    velocity: Option<Point2>,
    /// Number of corrections applied
    update_count: u64,
}

impl TrackedObject {
    /// Start a filter at `position` with zero velocity and acceleration
    pub fn new(position: Point2, dt: f64, config: &FilterConfig) -> Self {
        let mut state = Vector6::zeros();
        state[X] = position.x;
        state[Y] = position.y;

        let prior =
            Vector6::from_row_slice(&config.initial_covariance) * config.initial_covariance_scale;
        let variance = config.measurement_std * config.measurement_std;

        trace!("Filter initialized at {}", position);
        Self {
            state,
            covariance: Matrix6::from_diagonal(&prior),
            transition: motion_model(dt),
            observation: measurement_matrix(),
            process_noise: process_noise(dt, config.process_noise_variance),
            measurement_noise: Matrix2::from_diagonal_element(variance),
            dt,
            location: None,
            velocity: None,
            update_count: 0,
        }
    }

    /// Advance state and covariance by one time step without a measurement
    pub fn predict(&mut self) {
        self.state = self.transition * self.state;
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;
        trace!("Predicted position: ({:.2}, {:.2})", self.state[X], self.state[Y]);
    }

    /// Fuse a position measurement into the predicted state
    ///
    /// `None` skips the correction; the cached location and velocity are
    /// refreshed either way.
    pub fn correct(&mut self, measurement: Option<Point2>) {
        if let Some(z) = measurement {
            let h = &self.observation;
            let innovation = Vector2::new(z.x, z.y) - h * self.state;
            let innovation_cov = h * self.covariance * h.transpose() + self.measurement_noise;

            match innovation_cov.try_inverse() {
                Some(s_inv) => {
                    let gain: SMatrix<f64, STATE_SIZE, MEASUREMENT_SIZE> =
                        self.covariance * h.transpose() * s_inv;
                    self.state += gain * innovation;

                    // Joseph form keeps the covariance symmetric
                    let i_kh = Matrix6::identity() - gain * h;
                    self.covariance = i_kh * self.covariance * i_kh.transpose()
                        + gain * self.measurement_noise * gain.transpose();
                    self.update_count += 1;
                }
                None => warn!("Singular innovation covariance, measurement {} skipped", z),
            }
        }

        self.location = Some(self.position());
        self.velocity = Some(Point2::new(self.state[VX], self.state[VY]));
        trace!(
            "Updated position: ({:.2}, {:.2}), velocity: ({:.2}, {:.2})",
            self.state[X],
            self.state[Y],
            self.state[VX],
            self.state[VY]
        );
    }

    /// One tracking step: predict, then correct with `location`
    pub fn update(&mut self, location: Point2) {
        self.predict();
        self.correct(Some(location));
    }

    /// Position after the last correction, `None` before the first one
    pub fn location(&self) -> Option<Point2> {
        self.location
    }

    /// Velocity after the last correction
    pub fn velocity(&self) -> Option<Point2> {
        self.velocity
    }

    /// Position held in the state vector right now
    pub fn position(&self) -> Point2 {
        Point2::new(self.state[X], self.state[Y])
    }

    /// Distance from the vehicle origin; infinite before the first
    /// correction so fresh objects are never considered close
    pub fn distance(&self) -> f64 {
        self.location.map_or(f64::INFINITY, |p| p.norm())
    }

    /// Speed relative to the vehicle; zero before the first correction
    pub fn relative_speed(&self) -> f64 {
        self.velocity.map_or(0.0, |v| v.norm())
    }

    /// Roll the current estimate forward under the motion model
    ///
    /// Samples are taken every `step` from `t = 0` until the horizon is
    /// covered, so the path has `ceil(length / step) + 1` points and the
    /// last one may overshoot `length` by less than one step. Paths are
    /// truncated at [`MAX_PATH_SAMPLES`] points. Noise is ignored: this is
    /// a deterministic projection, not a forecast distribution.
    pub fn future_path(&self, length: f64, step: f64) -> Polyline {
        let max_steps = MAX_PATH_SAMPLES - 1;
        let steps = if length > 0.0 && step > 0.0 {
            let exact = (length / step - STEP_COUNT_EPS).ceil().max(0.0);
            if exact.is_finite() && exact <= max_steps as f64 {
                exact as usize
            } else {
                warn!(
                    "Future path of {} every {} truncated to {} samples",
                    length, step, MAX_PATH_SAMPLES
                );
                max_steps
            }
        } else {
            0
        };

        let transition = motion_model(step);
        let mut state = self.state;
        let mut points = Vec::with_capacity(steps + 1);
        points.push(Point2::new(state[X], state[Y]));
        for _ in 0..steps {
            state = transition * state;
            points.push(Point2::new(state[X], state[Y]));
        }

        Polyline::new(points)
    }

    pub fn state(&self) -> &Vector6<f64> {
        &self.state
    }

    pub fn covariance(&self) -> &Matrix6<f64> {
        &self.covariance
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

// ============================================================================
// TESTS
// ============================================================================
