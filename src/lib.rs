//! # Cortex Link Library
//!
//! Serial link core for a ground robot driven by a cortex microcontroller.
//!
//! This library frames and validates the cortex's serial messages, turns
//! wheel-encoder status frames into odometry, produces bias-corrected
//! inertial samples, and sends pose estimates and pickup targets back.

pub mod commands;
pub mod config;
pub mod error;
pub mod imu;
pub mod odometry;
pub mod protocol;
pub mod serial;
pub mod session;
pub mod telemetry;
