//! # Inertial Module
//!
//! Bias-corrected angular rate and linear acceleration from a raw inertial
//! sensor.
//!
//! This module handles:
//! - The driver seam ([`InertialSensor`]); register-level drivers live elsewhere
//! - One-time stationary calibration of accel X/Y and gyro yaw bias
//! - Unit conversion: deg/s to rad/s, g to m/s²

pub mod calibration;
pub mod builder;

use crate::error::Result;

pub use builder::{ImuSample, InertialStateBuilder};
pub use calibration::InertialCalibration;

/// Sensor axis. For the gyro, X/Y/Z are roll/pitch/yaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Sensor bring-up settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSettings {
    /// Digital low-pass filter cutoff
    pub low_pass_hz: u16,
    /// Gyro full-scale range in deg/s
    pub gyro_range_dps: u16,
    /// Accelerometer full-scale range in g
    pub accel_range_g: u8,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            low_pass_hz: 5,
            gyro_range_dps: 2000,
            accel_range_g: 16,
        }
    }
}

/// Raw inertial sensor driver
///
/// Readings are calibrated physical units (g for acceleration, deg/s for
/// rotation rate) without bias correction. Reads block for one sample.
#[cfg_attr(test, mockall::automock)]
pub trait InertialSensor: Send {
    /// Apply filter and range settings
    fn configure(&mut self, settings: &SensorSettings) -> Result<()>;

    /// Acceleration along `axis`, in g
    fn read_accel(&mut self, axis: Axis) -> Result<f64>;

    /// Rotation rate about `axis`, in deg/s
    fn read_gyro(&mut self, axis: Axis) -> Result<f64>;
}

/// Stand-in for a robot without an inertial sensor attached.
///
/// Reports zero on every axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSensor;

impl InertialSensor for NullSensor {
    fn configure(&mut self, _settings: &SensorSettings) -> Result<()> {
        Ok(())
    }

    fn read_accel(&mut self, _axis: Axis) -> Result<f64> {
        Ok(0.0)
    }

    fn read_gyro(&mut self, _axis: Axis) -> Result<f64> {
        Ok(0.0)
    }
}
