//! # Inertial Calibration
//!
//! Bias is the arithmetic mean of `sample_count` raw readings taken while
//! the robot is stationary. Only accel X, accel Y and gyro yaw are
//! measured; accel Z and gyro roll/pitch have no calibration data and are
//! reported uncorrected.

use tracing::info;

use super::{Axis, InertialSensor};
use crate::error::{CortexError, Result};

/// Stationary bias measured at startup. Immutable once measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialCalibration {
    /// Accel X and Y bias, in g
    pub accel_bias: [f64; 2],
    /// Gyro yaw bias, in deg/s
    pub gyro_bias_yaw: f64,
    /// Number of samples averaged
    pub sample_count: usize,
}

impl InertialCalibration {
    /// Sample the sensor and average the bias axes
    ///
    /// Blocks for `sample_count` rounds of sensor reads.
    ///
    /// # Errors
    ///
    /// Returns `Sensor` if `sample_count` is zero, or the driver's error if
    /// a read fails.
    pub fn measure<S>(sensor: &mut S, sample_count: usize) -> Result<Self>
    where
        S: InertialSensor + ?Sized,
    {
        if sample_count == 0 {
            return Err(CortexError::Sensor(
                "calibration needs at least one sample".to_string(),
            ));
        }

        info!("Calibrating inertial sensor over {} samples", sample_count);

        // Running means stay exact for a constant stream
        let mut accel_x = 0.0;
        let mut accel_y = 0.0;
        let mut gyro_yaw = 0.0;

        for k in 0..sample_count {
            let weight = (k + 1) as f64;
            accel_x += (sensor.read_accel(Axis::X)? - accel_x) / weight;
            accel_y += (sensor.read_accel(Axis::Y)? - accel_y) / weight;
            gyro_yaw += (sensor.read_gyro(Axis::Z)? - gyro_yaw) / weight;
        }

        let calibration = Self {
            accel_bias: [accel_x, accel_y],
            gyro_bias_yaw: gyro_yaw,
            sample_count,
        };

        info!(
            "Inertial calibration done: accel bias=({:.5}, {:.5}) g, yaw bias={:.5} deg/s",
            calibration.accel_bias[0], calibration.accel_bias[1], calibration.gyro_bias_yaw
        );

        Ok(calibration)
    }
}
