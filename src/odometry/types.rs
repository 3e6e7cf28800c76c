//! Geometry records shared by the odometry and inertial outputs.

use serde::Serialize;

/// Plain 3-vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Rotation about +Z by `yaw` radians
    pub fn from_yaw(yaw: f64) -> Self {
        let (sin, cos) = (yaw * 0.5).sin_cos();
        Self { x: 0.0, y: 0.0, z: sin, w: cos }
    }

    /// Yaw angle in radians, in `[-PI, PI]`
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Incremental planar motion of one odometry step, in the world frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PoseDelta {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

/// Linear and angular velocity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

/// Diagonal 6x6 covariance over (x, y, z, roll, pitch, yaw)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Covariance6 {
    pub diagonal: [f64; 6],
}

impl Covariance6 {
    /// Same variance on every axis
    pub fn uniform(variance: f64) -> Self {
        Self { diagonal: [variance; 6] }
    }

    /// Expand to the full row-major matrix
    pub fn matrix(&self) -> [[f64; 6]; 6] {
        let mut matrix = [[0.0; 6]; 6];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = self.diagonal[i];
        }
        matrix
    }
}

/// Diagonal 3x3 covariance in row-major order
pub fn diagonal3(variance: f64) -> [f64; 9] {
    let mut matrix = [0.0; 9];
    for i in 0..3 {
        matrix[i * 4] = variance;
    }
    matrix
}
