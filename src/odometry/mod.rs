//! # Odometry Module
//!
//! Dead reckoning from the cortex's absolute wheel-encoder counters using a
//! differential-drive model.
//!
//! Per status frame:
//!
//! ```text
//! avg       = (dL + dR) / 2          distance = avg * straight_scale
//! half_diff = (dR - dL) / 2          dtheta   = half_diff * turn_scale
//! heading   = theta + dtheta
//! dx = cos(heading) * distance       dy = sin(heading) * distance
//! ```
//!
//! The step's direction uses the heading *after* applying `dtheta`. The
//! accumulated heading is never wrapped. No filtering is applied; error
//! grows without bound and is expected to be fused downstream.

pub mod types;

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

pub use types::{Covariance6, PoseDelta, Quaternion, Twist, Vector3};

/// Hardware constants and reported covariance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryParams {
    /// Distance units per averaged encoder tick
    pub straight_scale: f64,
    /// Radians per tick of half wheel difference
    pub turn_scale: f64,
    /// Heading at startup, in radians
    pub initial_heading: f64,
    pub pose_covariance: f64,
    pub twist_covariance: f64,
}

impl Default for OdometryParams {
    fn default() -> Self {
        Self {
            straight_scale: 0.716457354,
            turn_scale: 0.0174533,
            initial_heading: 0.0,
            pose_covariance: 0.01,
            twist_covariance: 0.01,
        }
    }
}

/// Persistent dead-reckoning state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryState {
    pub last_left_count: i32,
    pub last_right_count: i32,
    pub global_x: f64,
    pub global_y: f64,
    /// Unbounded heading in radians
    pub global_theta: f64,
    pub last_update_time: Instant,
}

/// Result of one odometry step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdometryUpdate {
    /// Accumulated world-frame position
    pub position: Vector3,
    /// Yaw-only orientation derived from the step's heading
    pub orientation: Quaternion,
    /// Heading used for this step, in radians (unbounded)
    pub heading: f64,
    pub delta: PoseDelta,
    /// Seconds since the previous status frame
    pub dt: f64,
    /// `None` when `dt` is zero
    pub velocity: Option<Twist>,
    pub pose_covariance: Covariance6,
    pub twist_covariance: Covariance6,
}

/// Differential-drive odometry engine
#[derive(Debug, Clone)]
pub struct OdometryEngine {
    params: OdometryParams,
    state: OdometryState,
}

impl OdometryEngine {
    /// Create an engine at the origin with zeroed encoder history.
    ///
    /// `now` is the reference time for the first step's `dt`.
    pub fn new(params: OdometryParams, now: Instant) -> Self {
        Self {
            params,
            state: OdometryState {
                last_left_count: 0,
                last_right_count: 0,
                global_x: 0.0,
                global_y: 0.0,
                global_theta: params.initial_heading,
                last_update_time: now,
            },
        }
    }

    pub fn params(&self) -> &OdometryParams {
        &self.params
    }

    pub fn state(&self) -> &OdometryState {
        &self.state
    }

    /// Integrate one pair of absolute encoder counters
    ///
    /// Counter deltas use wrapping arithmetic so a 32-bit rollover shows up
    /// as a small step.
    pub fn update(&mut self, left_count: i32, right_count: i32, now: Instant) -> OdometryUpdate {
        let state = &mut self.state;

        let left_delta = f64::from(left_count.wrapping_sub(state.last_left_count));
        let right_delta = f64::from(right_count.wrapping_sub(state.last_right_count));
        state.last_left_count = left_count;
        state.last_right_count = right_count;

        let avg = (left_delta + right_delta) / 2.0;
        let half_diff = (right_delta - left_delta) / 2.0;

        let dt = now.saturating_duration_since(state.last_update_time).as_secs_f64();
        state.last_update_time = now;

        let linear_distance = avg * self.params.straight_scale;
        let angular_delta = half_diff * self.params.turn_scale;

        let heading = state.global_theta + angular_delta;
        let dx = heading.cos() * linear_distance;
        let dy = heading.sin() * linear_distance;

        let velocity = if dt > 0.0 {
            Some(Twist {
                linear: Vector3::new(dx / dt, dy / dt, 0.0),
                angular: Vector3::new(0.0, 0.0, angular_delta / dt),
            })
        } else {
            warn!("Odometry step with zero elapsed time, velocity not reported");
            None
        };

        state.global_x += dx;
        state.global_y += dy;
        state.global_theta += angular_delta;

        debug!(
            "Odometry dL={} dR={} dist={:.3} dtheta={:.4} pose=({:.3}, {:.3}, {:.4})",
            left_delta,
            right_delta,
            linear_distance,
            angular_delta,
            state.global_x,
            state.global_y,
            state.global_theta
        );

        OdometryUpdate {
            position: Vector3::new(state.global_x, state.global_y, 0.0),
            orientation: Quaternion::from_yaw(heading),
            heading,
            delta: PoseDelta {
                dx,
                dy,
                dtheta: angular_delta,
            },
            dt,
            velocity,
            pose_covariance: Covariance6::uniform(self.params.pose_covariance),
            twist_covariance: Covariance6::uniform(self.params.twist_covariance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::time::Duration;

    const EPS: f64 = 1e-9;

    fn engine_with(turn_scale: f64, initial_heading: f64) -> (OdometryEngine, Instant) {
        let start = Instant::now();
        let params = OdometryParams {
            turn_scale,
            initial_heading,
            ..OdometryParams::default()
        };
        (OdometryEngine::new(params, start), start)
    }

    #[test]
    fn test_straight_line_from_rest() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        let update = engine.update(100, 100, start + Duration::from_secs(1));

        let expected = 100.0 * 0.716457354;
        assert!((update.delta.dx - expected).abs() < EPS);
        assert!(update.delta.dy.abs() < EPS);
        assert_eq!(update.delta.dtheta, 0.0);
        assert!((update.dt - 1.0).abs() < EPS);

        let state = engine.state();
        assert!((state.global_x - 71.6457354).abs() < 1e-6);
        assert!(state.global_y.abs() < EPS);
        assert_eq!(state.global_theta, 0.0);
        assert_eq!(state.last_left_count, 100);
        assert_eq!(state.last_right_count, 100);

        let velocity = update.velocity.unwrap();
        assert!((velocity.linear.x - expected).abs() < EPS);
        assert_eq!(velocity.angular.z, 0.0);
        assert_eq!(update.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_equal_deltas_follow_existing_heading() {
        let (mut engine, start) = engine_with(0.01, FRAC_PI_2);
        let update = engine.update(50, 50, start + Duration::from_millis(500));

        let distance = 50.0 * 0.716457354;
        assert!(update.delta.dx.abs() < 1e-6);
        assert!((update.delta.dy - distance).abs() < EPS);
        assert_eq!(engine.state().global_theta, FRAC_PI_2);

        let velocity = update.velocity.unwrap();
        assert!((velocity.linear.y - distance * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_deltas_rotate_in_place() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        let update = engine.update(-40, 40, start + Duration::from_secs(2));

        assert_eq!(update.delta.dx, 0.0);
        assert_eq!(update.delta.dy, 0.0);
        assert!((update.delta.dtheta - 0.4).abs() < EPS);

        let state = engine.state();
        assert_eq!(state.global_x, 0.0);
        assert_eq!(state.global_y, 0.0);
        assert!((state.global_theta - 0.4).abs() < EPS);
        assert!((update.velocity.unwrap().angular.z - 0.2).abs() < EPS);
    }

    #[test]
    fn test_direction_uses_updated_heading() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        let update = engine.update(0, 100, start + Duration::from_secs(1));

        let distance = 50.0 * 0.716457354;
        let heading = 50.0 * 0.01;
        assert!((update.heading - heading).abs() < EPS);
        assert!((update.delta.dx - heading.cos() * distance).abs() < EPS);
        assert!((update.delta.dy - heading.sin() * distance).abs() < EPS);
        assert!((update.orientation.yaw() - heading).abs() < EPS);
    }

    #[test]
    fn test_deltas_are_relative_to_last_counts() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        engine.update(1000, 1000, start + Duration::from_secs(1));
        let update = engine.update(1010, 1010, start + Duration::from_secs(2));

        assert!((update.delta.dx - 10.0 * 0.716457354).abs() < EPS);
        assert!((update.dt - 1.0).abs() < EPS);
    }

    #[test]
    fn test_encoder_rollover_is_small_step() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        engine.update(i32::MAX - 4, i32::MAX - 4, start + Duration::from_secs(1));
        let update = engine.update(i32::MIN + 5, i32::MIN + 5, start + Duration::from_secs(2));

        assert!((update.delta.dx - 10.0 * 0.716457354).abs() < EPS);
    }

    #[test]
    fn test_zero_dt_reports_no_velocity() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        let update = engine.update(10, 10, start);

        assert_eq!(update.dt, 0.0);
        assert!(update.velocity.is_none());
        // Pose still accumulates
        assert!(engine.state().global_x > 0.0);
    }

    #[test]
    fn test_heading_accumulates_without_wrapping() {
        let (mut engine, start) = engine_with(0.01, 0.0);
        let mut right = 0;
        for step in 1..=10u64 {
            right += 100;
            engine.update(-right, right, start + Duration::from_secs(step));
        }

        // Ten turns of 1 rad each
        let theta = engine.state().global_theta;
        assert!(theta > 2.0 * PI);
        assert!((theta - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_for_identical_streams() {
        let start = Instant::now();
        let params = OdometryParams::default();
        let mut a = OdometryEngine::new(params, start);
        let mut b = OdometryEngine::new(params, start);

        let stream = [(10, 12), (25, 20), (25, 40), (-5, 60)];
        for (i, (left, right)) in stream.iter().enumerate() {
            let now = start + Duration::from_millis(100 * (i as u64 + 1));
            assert_eq!(a.update(*left, *right, now), b.update(*left, *right, now));
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_covariance_from_params() {
        let start = Instant::now();
        let params = OdometryParams {
            pose_covariance: 0.5,
            twist_covariance: 0.25,
            ..OdometryParams::default()
        };
        let mut engine = OdometryEngine::new(params, start);
        let update = engine.update(0, 0, start + Duration::from_secs(1));
        assert_eq!(update.pose_covariance.diagonal, [0.5; 6]);
        assert_eq!(update.twist_covariance.diagonal, [0.25; 6]);
    }
}
