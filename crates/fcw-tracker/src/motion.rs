//! Constant-acceleration motion model
//!
//! State layout is `[x, vx, ax, y, vy, ay]`: two independent
//! position/velocity/acceleration chains stacked block-diagonally.

use nalgebra::{Matrix2x6, Matrix3, Matrix6};

/// State dimension
pub const STATE_SIZE: usize = 6;
/// Measurement dimension, `(x, y)`
pub const MEASUREMENT_SIZE: usize = 2;

/// Index of the x position in the state vector
pub const X: usize = 0;
/// Index of the x velocity
pub const VX: usize = 1;
/// Index of the y position
pub const Y: usize = 3;
/// Index of the y velocity
pub const VY: usize = 4;

/// State transition matrix for a time step `dt`
///
/// Position gains `v·dt + ½·a·dt²`, velocity gains `a·dt`, acceleration
/// is unchanged. `dt` must be finite and positive.
pub fn motion_model(dt: f64) -> Matrix6<f64> {
    let block = Matrix3::new(
        1.0, dt, 0.5 * dt * dt, //
        0.0, 1.0, dt, //
        0.0, 0.0, 1.0,
    );
    block_diagonal(&block)
}

/// Discrete white-noise process covariance for a constant-acceleration
/// chain, one block per axis
pub fn process_noise(dt: f64, variance: f64) -> Matrix6<f64> {
    let dt2 = dt * dt;
    let dt3 = dt2 * dt;
    let dt4 = dt3 * dt;

    let block = Matrix3::new(
        dt4 / 4.0, dt3 / 2.0, dt2 / 2.0, //
        dt3 / 2.0, dt2, dt, //
        dt2 / 2.0, dt, 1.0,
    ) * variance;
    block_diagonal(&block)
}

/// Observation matrix selecting `x` and `y`
pub fn measurement_matrix() -> Matrix2x6<f64> {
    let mut h = Matrix2x6::zeros();
    h[(0, X)] = 1.0;
    h[(1, Y)] = 1.0;
    h
}

fn block_diagonal(block: &Matrix3<f64>) -> Matrix6<f64> {
    let mut m = Matrix6::zeros();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(block);
    m.fixed_view_mut::<3, 3>(3, 3).copy_from(block);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector6;

    #[test]
    fn test_stationary_object_stays_put() {
        let state = Vector6::new(4.0, 0.0, 0.0, -7.5, 0.0, 0.0);
        for dt in [0.01, 0.1, 1.0, 3.7] {
            assert_eq!(motion_model(dt) * state, state);
        }
    }

    #[test]
    fn test_constant_acceleration_kinematics() {
        // x: v = 2, a = 1; y: v = -5, a = 0
        let state = Vector6::new(0.0, 2.0, 1.0, 15.0, -5.0, 0.0);
        let next = motion_model(2.0) * state;

        assert_abs_diff_eq!(next[X], 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[VX], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[Y], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[VY], -5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axes_are_decoupled() {
        let f = motion_model(0.5);
        for r in 0..3 {
            for c in 3..6 {
                assert_eq!(f[(r, c)], 0.0);
                assert_eq!(f[(c, r)], 0.0);
            }
        }
    }

    #[test]
    fn test_process_noise_is_symmetric() {
        let q = process_noise(1.0, 0.01);
        assert_eq!(q, q.transpose());
        assert_abs_diff_eq!(q[(0, 0)], 0.0025, epsilon = 1e-15);
        assert_abs_diff_eq!(q[(5, 5)], 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_measurement_matrix_selects_position() {
        let state = Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let z = measurement_matrix() * state;
        assert_eq!((z[0], z[1]), (1.0, 4.0));
    }
}
