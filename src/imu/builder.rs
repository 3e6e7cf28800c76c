//! # Inertial State Builder
//!
//! Turns raw sensor reads into an [`ImuSample`] using the startup
//! calibration.

use serde::Serialize;
use std::f64::consts::PI;

use super::{Axis, InertialCalibration, InertialSensor, SensorSettings};
use crate::error::{CortexError, Result};
use crate::odometry::types::{diagonal3, Vector3};

/// Degrees per second to radians per second
pub const DPS_TO_RPS: f64 = PI / 180.0;

/// Standard gravity, m/s² per g
pub const GRAVITY: f64 = 9.80665;

/// One inertial reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImuSample {
    /// rad/s; only yaw (z) is bias corrected
    pub angular_velocity: Vector3,
    /// m/s²; only x and y are bias corrected
    pub linear_acceleration: Vector3,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration_covariance: [f64; 9],
}

/// Builds bias-corrected samples from a raw sensor
pub struct InertialStateBuilder<S> {
    sensor: S,
    calibration: Option<InertialCalibration>,
    covariance: f64,
}

impl<S> std::fmt::Debug for InertialStateBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InertialStateBuilder")
            .field("calibration", &self.calibration)
            .field("covariance", &self.covariance)
            .finish_non_exhaustive()
    }
}

impl<S: InertialSensor> InertialStateBuilder<S> {
    /// Wrap an uncalibrated sensor.
    ///
    /// `covariance` is the fixed diagonal reported on every sample.
    pub fn new(sensor: S, covariance: f64) -> Self {
        Self {
            sensor,
            calibration: None,
            covariance,
        }
    }

    /// Forward bring-up settings to the driver
    pub fn configure(&mut self, settings: &SensorSettings) -> Result<()> {
        self.sensor.configure(settings)
    }

    /// Measure bias over `sample_count` reads and keep it.
    ///
    /// Calibration happens once; later calls return the stored result.
    pub fn calibrate(&mut self, sample_count: usize) -> Result<&InertialCalibration> {
        if self.calibration.is_none() {
            let measured = InertialCalibration::measure(&mut self.sensor, sample_count)?;
            self.calibration = Some(measured);
        }

        self.calibration.as_ref().ok_or(CortexError::CalibrationIncomplete)
    }

    pub fn calibration(&self) -> Option<&InertialCalibration> {
        self.calibration.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Read all six axes and apply bias and unit conversion
    ///
    /// # Errors
    ///
    /// Returns `CalibrationIncomplete` if [`calibrate`](Self::calibrate) has
    /// not run, or the driver's error if a read fails.
    pub fn sample(&mut self) -> Result<ImuSample> {
        let calibration = self.calibration.ok_or(CortexError::CalibrationIncomplete)?;

        let roll_rate = self.sensor.read_gyro(Axis::X)?;
        let pitch_rate = self.sensor.read_gyro(Axis::Y)?;
        let yaw_rate = self.sensor.read_gyro(Axis::Z)?;

        let accel_x = self.sensor.read_accel(Axis::X)?;
        let accel_y = self.sensor.read_accel(Axis::Y)?;
        let accel_z = self.sensor.read_accel(Axis::Z)?;

        let covariance = diagonal3(self.covariance);

        Ok(ImuSample {
            angular_velocity: Vector3::new(
                roll_rate * DPS_TO_RPS,
                pitch_rate * DPS_TO_RPS,
                (yaw_rate - calibration.gyro_bias_yaw) * DPS_TO_RPS,
            ),
            linear_acceleration: Vector3::new(
                (accel_x - calibration.accel_bias[0]) * GRAVITY,
                (accel_y - calibration.accel_bias[1]) * GRAVITY,
                accel_z * GRAVITY,
            ),
            angular_velocity_covariance: covariance,
            linear_acceleration_covariance: covariance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::MockInertialSensor;

    /// Sensor returning fixed readings per axis
    fn constant_sensor(accel: [f64; 3], gyro: [f64; 3]) -> MockInertialSensor {
        let mut sensor = MockInertialSensor::new();
        sensor.expect_read_accel().returning(move |axis| {
            Ok(match axis {
                Axis::X => accel[0],
                Axis::Y => accel[1],
                Axis::Z => accel[2],
            })
        });
        sensor.expect_read_gyro().returning(move |axis| {
            Ok(match axis {
                Axis::X => gyro[0],
                Axis::Y => gyro[1],
                Axis::Z => gyro[2],
            })
        });
        sensor
    }

    #[test]
    fn test_sample_before_calibration_fails() {
        let mut builder = InertialStateBuilder::new(MockInertialSensor::new(), 0.0);
        assert!(!builder.is_calibrated());
        assert!(matches!(builder.sample(), Err(CortexError::CalibrationIncomplete)));
    }

    #[test]
    fn test_stationary_readings_correct_to_zero() {
        let sensor = constant_sensor([0.5, -0.25, 1.0], [2.0, -3.0, 0.75]);
        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        builder.calibrate(100).unwrap();

        let sample = builder.sample().unwrap();
        assert_eq!(sample.linear_acceleration.x, 0.0);
        assert_eq!(sample.linear_acceleration.y, 0.0);
        assert_eq!(sample.angular_velocity.z, 0.0);
    }

    #[test]
    fn test_constant_tenth_g_corrects_to_zero() {
        let sensor = constant_sensor([0.1, 0.1, 1.0], [0.0, 0.0, 0.1]);
        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        let calibration = *builder.calibrate(1000).unwrap();
        assert_eq!(calibration.accel_bias[0], 0.1);

        let sample = builder.sample().unwrap();
        assert_eq!(sample.linear_acceleration.x, 0.0);
        assert_eq!(sample.linear_acceleration.y, 0.0);
        assert_eq!(sample.angular_velocity.z, 0.0);
    }

    #[test]
    fn test_uncalibrated_axes_pass_through_converted() {
        let sensor = constant_sensor([0.5, -0.25, 1.0], [2.0, -3.0, 0.75]);
        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        builder.calibrate(10).unwrap();

        let sample = builder.sample().unwrap();
        assert_eq!(sample.linear_acceleration.z, GRAVITY);
        assert_eq!(sample.angular_velocity.x, 2.0 * DPS_TO_RPS);
        assert_eq!(sample.angular_velocity.y, -3.0 * DPS_TO_RPS);
    }

    #[test]
    fn test_bias_subtracted_before_unit_conversion() {
        let mut sensor = MockInertialSensor::new();
        let mut calls = 0usize;
        // 10 calibration reads of 0.5 g on X, then 1.5 g
        sensor.expect_read_accel().returning(move |axis| {
            if axis != Axis::X {
                return Ok(0.0);
            }
            calls += 1;
            Ok(if calls <= 10 { 0.5 } else { 1.5 })
        });
        sensor.expect_read_gyro().returning(|_| Ok(0.0));

        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        builder.calibrate(10).unwrap();
        let sample = builder.sample().unwrap();
        assert!((sample.linear_acceleration.x - GRAVITY).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_runs_once() {
        let mut sensor = MockInertialSensor::new();
        sensor.expect_read_accel().times(10).returning(|_| Ok(0.0));
        sensor.expect_read_gyro().times(5).returning(|_| Ok(0.0));

        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        builder.calibrate(5).unwrap();
        builder.calibrate(5).unwrap();
        assert_eq!(builder.calibration().unwrap().sample_count, 5);
    }

    #[test]
    fn test_fixed_covariance() {
        let sensor = constant_sensor([0.0; 3], [0.0; 3]);
        let mut builder = InertialStateBuilder::new(sensor, 0.02);
        builder.calibrate(1).unwrap();

        let sample = builder.sample().unwrap();
        assert_eq!(sample.angular_velocity_covariance, diagonal3(0.02));
        assert_eq!(sample.linear_acceleration_covariance, diagonal3(0.02));
    }

    #[test]
    fn test_configure_forwards_settings() {
        let mut sensor = MockInertialSensor::new();
        sensor
            .expect_configure()
            .withf(|settings| settings.gyro_range_dps == 500)
            .times(1)
            .returning(|_| Ok(()));

        let mut builder = InertialStateBuilder::new(sensor, 0.0);
        let settings = SensorSettings {
            gyro_range_dps: 500,
            ..SensorSettings::default()
        };
        builder.configure(&settings).unwrap();
    }
}
