//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration for the reference robot.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{CortexError, Result};
use crate::imu::SensorSettings;
use crate::odometry::OdometryParams;
use crate::protocol::sequence::SequencePolicy;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub odometry: OdometryConfig,
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Link protocol configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    /// Seed each message type's counter independently. `false` keeps the
    /// legacy single first-message flag shared by all types.
    #[serde(default)]
    pub bootstrap_per_type: bool,

    /// Adopt the received counter after a mismatch. Off by default, so a
    /// rejected counter leaves the stored one untouched.
    #[serde(default = "default_resync_on_mismatch")]
    pub resync_on_mismatch: bool,
}

/// Odometry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OdometryConfig {
    #[serde(default = "default_straight_scale")]
    pub straight_scale: f64,

    #[serde(default = "default_turn_scale")]
    pub turn_scale: f64,

    #[serde(default)]
    pub initial_heading: f64,

    #[serde(default = "default_odometry_covariance")]
    pub pose_covariance: f64,

    #[serde(default = "default_odometry_covariance")]
    pub twist_covariance: f64,
}

/// Inertial sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default = "default_calibration_samples")]
    pub calibration_samples: usize,

    #[serde(default = "default_low_pass_hz")]
    pub low_pass_hz: u16,

    #[serde(default = "default_gyro_range_dps")]
    pub gyro_range_dps: u16,

    #[serde(default = "default_accel_range_g")]
    pub accel_range_g: u8,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub covariance: f64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file. Stderr only when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_read_timeout_ms() -> u64 { 1000 }

fn default_resync_on_mismatch() -> bool { false }

fn default_straight_scale() -> f64 { 0.716457354 }
fn default_turn_scale() -> f64 { 0.0174533 }
fn default_odometry_covariance() -> f64 { 0.01 }

fn default_calibration_samples() -> usize { 1000 }
fn default_low_pass_hz() -> u16 { 5 }
fn default_gyro_range_dps() -> u16 { 2000 }
fn default_accel_range_g() -> u8 { 16 }
fn default_settle_ms() -> u64 { 600 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

const VALID_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];
const VALID_GYRO_RANGES: [u16; 4] = [250, 500, 1000, 2000];
const VALID_ACCEL_RANGES: [u8; 4] = [2, 4, 8, 16];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bootstrap_per_type: false,
            resync_on_mismatch: default_resync_on_mismatch(),
        }
    }
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            straight_scale: default_straight_scale(),
            turn_scale: default_turn_scale(),
            initial_heading: 0.0,
            pose_covariance: default_odometry_covariance(),
            twist_covariance: default_odometry_covariance(),
        }
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            calibration_samples: default_calibration_samples(),
            low_pass_hz: default_low_pass_hz(),
            gyro_range_dps: default_gyro_range_dps(),
            accel_range_g: default_accel_range_g(),
            settle_ms: default_settle_ms(),
            covariance: 0.0,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl SerialConfig {
    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ProtocolConfig {
    /// Sequence tracker policy derived from this section
    pub fn sequence_policy(&self) -> SequencePolicy {
        SequencePolicy {
            bootstrap_per_type: self.bootstrap_per_type,
            resync_on_mismatch: self.resync_on_mismatch,
        }
    }
}

impl OdometryConfig {
    /// Odometry engine parameters derived from this section
    pub fn params(&self) -> OdometryParams {
        OdometryParams {
            straight_scale: self.straight_scale,
            turn_scale: self.turn_scale,
            initial_heading: self.initial_heading,
            pose_covariance: self.pose_covariance,
            twist_covariance: self.twist_covariance,
        }
    }
}

impl ImuConfig {
    /// Sensor bring-up settings derived from this section
    pub fn sensor_settings(&self) -> SensorSettings {
        SensorSettings {
            low_pass_hz: self.low_pass_hz,
            gyro_range_dps: self.gyro_range_dps,
            accel_range_g: self.accel_range_g,
        }
    }

    /// Settle delay after configuring the sensor
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> CortexError {
    CortexError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cortex_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                VALID_BAUD_RATES
            )));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 60000 {
            return Err(invalid("read_timeout_ms must be between 1 and 60000"));
        }

        for (name, value) in [
            ("straight_scale", self.odometry.straight_scale),
            ("turn_scale", self.odometry.turn_scale),
            ("initial_heading", self.odometry.initial_heading),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be a finite number", name)));
            }
        }

        for (name, value) in [
            ("odometry.pose_covariance", self.odometry.pose_covariance),
            ("odometry.twist_covariance", self.odometry.twist_covariance),
            ("imu.covariance", self.imu.covariance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number", name)));
            }
        }

        if self.imu.calibration_samples == 0 {
            return Err(invalid("calibration_samples must be greater than 0"));
        }

        if self.imu.low_pass_hz == 0 {
            return Err(invalid("low_pass_hz must be greater than 0"));
        }

        if !VALID_GYRO_RANGES.contains(&self.imu.gyro_range_dps) {
            return Err(invalid(format!(
                "gyro_range_dps must be one of: {:?}",
                VALID_GYRO_RANGES
            )));
        }

        if !VALID_ACCEL_RANGES.contains(&self.imu.accel_range_g) {
            return Err(invalid(format!(
                "accel_range_g must be one of: {:?}",
                VALID_ACCEL_RANGES
            )));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if matches!(self.logging.directory.as_deref(), Some("")) {
            return Err(invalid("logging directory cannot be empty when set"));
        }

        Ok(())
    }
}
