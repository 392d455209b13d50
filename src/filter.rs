//! Sequential position smoothing.
//!
//! # Constant-acceleration Kalman filter
//! State vector (9-dimensional):
//! x = [px, py, pz, vx, vy, vz, ax, ay, az]ᵀ
//!
//! Transition for a step `dt`:
//! p' = p + v·dt + ½·a·dt²,  v' = v + a·dt,  a' = a
//!
//! Only position is observed: H = [I₃ 0₃ 0₃].
//!
//! For GPX smoothing the horizontal axes carry latitude/longitude in degrees
//! and the vertical axis carries elevation in metres. The axes are decoupled
//! (F, Q, R and the initial covariance are all block-diagonal per axis), so
//! the mixed units do not leak into each other.

use std::collections::VecDeque;

use log::warn;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

pub type StateVector = SVector<f64, 9>;
pub type StateCovariance = SMatrix<f64, 9, 9>;
type ObservationMatrix = SMatrix<f64, 3, 9>;
type GainMatrix = SMatrix<f64, 9, 3>;

/// A causal smoother fed one 3D measurement at a time.
pub trait PositionFilter {
    /// Consume the next measurement.
    fn update(&mut self, x: f64, y: f64, z: f64);

    /// Current position estimate.
    fn read(&self) -> (f64, f64, f64);
}

/// Tuning for [`KalmanFilter3D`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Step interval used by [`PositionFilter::update`].
    pub dt: f64,
    /// Diagonal of the initial covariance.
    pub initial_covariance: f64,
    pub position_process_noise: f64,
    pub velocity_process_noise: f64,
    /// Acceleration is the least predictable component, so it gets the
    /// largest process noise.
    pub acceleration_process_noise: f64,
    /// Measurement variance of the two horizontal axes.
    pub horizontal_measurement_noise: f64,
    /// Measurement variance of the vertical axis; receivers are much worse at
    /// altitude than at position.
    pub vertical_measurement_noise: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            initial_covariance: 1000.0,
            position_process_noise: 0.01,
            velocity_process_noise: 0.01,
            acceleration_process_noise: 0.1,
            horizontal_measurement_noise: 5.0,
            vertical_measurement_noise: 20.0,
        }
    }
}

/// 3D constant-acceleration Kalman filter. One instance per track; it is
/// never shared between tracks.
#[derive(Debug, Clone)]
pub struct KalmanFilter3D {
    config: FilterConfig,
    state: StateVector,
    covariance: StateCovariance,
    observation: ObservationMatrix,
    process_noise: StateCovariance,
    measurement_noise: Matrix3<f64>,
}

impl KalmanFilter3D {
    /// Start at `(x0, y0, z0)` with zero velocity and acceleration.
    pub fn new(x0: f64, y0: f64, z0: f64, config: FilterConfig) -> Self {
        let mut state = StateVector::zeros();
        state[0] = x0;
        state[1] = y0;
        state[2] = z0;

        let mut observation = ObservationMatrix::zeros();
        for i in 0..3 {
            observation[(i, i)] = 1.0;
        }

        let mut process_noise = StateCovariance::zeros();
        for i in 0..3 {
            process_noise[(i, i)] = config.position_process_noise;
            process_noise[(i + 3, i + 3)] = config.velocity_process_noise;
            process_noise[(i + 6, i + 6)] = config.acceleration_process_noise;
        }

        let measurement_noise = Matrix3::from_diagonal(&Vector3::new(
            config.horizontal_measurement_noise,
            config.horizontal_measurement_noise,
            config.vertical_measurement_noise,
        ));

        Self {
            config,
            state,
            covariance: StateCovariance::identity() * config.initial_covariance,
            observation,
            process_noise,
            measurement_noise,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn covariance(&self) -> &StateCovariance {
        &self.covariance
    }

    pub fn velocity(&self) -> (f64, f64, f64) {
        (self.state[3], self.state[4], self.state[5])
    }

    /// Build state transition matrix F for timestep dt.
    pub fn transition_matrix(dt: f64) -> StateCovariance {
        let mut f = StateCovariance::identity();
        let half_dt2 = 0.5 * dt * dt;
        for i in 0..3 {
            f[(i, i + 3)] = dt;
            f[(i, i + 6)] = half_dt2;
            f[(i + 3, i + 6)] = dt;
        }
        f
    }

    /// One predict/correct cycle with an explicit step interval.
    pub fn update_with_dt(&mut self, x: f64, y: f64, z: f64, dt: f64) {
        // Predict
        let f = Self::transition_matrix(dt);
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;

        // Innovation: y = z − H·x
        let residual = Vector3::new(x, y, z) - self.observation * self.state;

        // Innovation covariance: S = H·P·Hᵀ + R
        let pht = self.covariance * self.observation.transpose();
        let s = self.observation * pht + self.measurement_noise;

        // Kalman gain K = P·Hᵀ·S⁻¹, obtained by solving S·Kᵀ = (P·Hᵀ)ᵀ
        let Some(gain_t) = solve_innovation(&s, &pht.transpose()) else {
            warn!("innovation covariance is singular, skipping correction");
            return;
        };
        let gain: GainMatrix = gain_t.transpose();

        self.state += gain * residual;
        self.covariance = (StateCovariance::identity() - gain * self.observation) * self.covariance;
    }
}

impl PositionFilter for KalmanFilter3D {
    fn update(&mut self, x: f64, y: f64, z: f64) {
        let dt = self.config.dt;
        self.update_with_dt(x, y, z, dt);
    }

    fn read(&self) -> (f64, f64, f64) {
        (self.state[0], self.state[1], self.state[2])
    }
}

/// Solve S·X = B. S is symmetric positive definite in exact arithmetic, so
/// Cholesky is tried first; LU covers the case where rounding breaks that.
fn solve_innovation(
    s: &Matrix3<f64>,
    rhs: &SMatrix<f64, 3, 9>,
) -> Option<SMatrix<f64, 3, 9>> {
    if let Some(chol) = (*s).cholesky() {
        return Some(chol.solve(rhs));
    }
    (*s).lu().solve(rhs)
}

/// Trailing mean over the last `window` measurements.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    window: usize,
    initial: (f64, f64, f64),
    samples: VecDeque<(f64, f64, f64)>,
}

impl MovingAverageFilter {
    pub fn new(x0: f64, y0: f64, z0: f64, window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            initial: (x0, y0, z0),
            samples: VecDeque::with_capacity(window),
        }
    }
}

impl PositionFilter for MovingAverageFilter {
    fn update(&mut self, x: f64, y: f64, z: f64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back((x, y, z));
    }

    fn read(&self) -> (f64, f64, f64) {
        if self.samples.is_empty() {
            return self.initial;
        }
        let n = self.samples.len() as f64;
        let (sx, sy, sz) = self
            .samples
            .iter()
            .fold((0.0, 0.0, 0.0), |acc, s| (acc.0 + s.0, acc.1 + s.1, acc.2 + s.2));
        (sx / n, sy / n, sz / n)
    }
}
