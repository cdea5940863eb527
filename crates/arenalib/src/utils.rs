//! Planar math helpers shared by the environments.
//!
//! The simulated worlds are planar: entities move in the x/z plane and the
//! vertical axis is fixed, so a 2-component vector covers every transform
//! the observation and reward code needs.

use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};

/// A point or direction in the x/z plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// Unit vector, or zero when the input is (near-)zero.
    ///
    /// Matches the host-engine convention the movement code relies on: a
    /// rest action produces zero velocity, not NaN.
    pub fn normalize_or_zero(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.z / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.z * rhs)
    }
}

/// Degrees to radians.
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

/// Append the `(sin θ, cos θ)` encoding of an angle in degrees.
///
/// Angles are never observed raw: the sin/cos pair keeps the encoding
/// continuous across the 0/360° wrap.
pub fn push_angle(obs: &mut Vec<f32>, angle_deg: f32) {
    let rad = deg_to_rad(angle_deg);
    obs.push(rad.sin());
    obs.push(rad.cos());
}

/// Heading yaw (degrees) to a forward unit vector in the x/z plane.
pub fn heading_forward(angle_deg: f32) -> Vec2 {
    let rad = deg_to_rad(angle_deg);
    Vec2::new(rad.sin(), rad.cos())
}

/// Heading yaw (degrees) to the rightward unit vector in the x/z plane.
pub fn heading_right(angle_deg: f32) -> Vec2 {
    let rad = deg_to_rad(angle_deg);
    Vec2::new(rad.cos(), -rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_angle_periodicity() {
        for deg in [-720.0, -45.0, 0.0, 10.0, 90.0, 359.9, 1000.0] {
            let mut a = Vec::new();
            let mut b = Vec::new();
            push_angle(&mut a, deg);
            push_angle(&mut b, deg + 360.0);
            assert!((a[0] - b[0]).abs() < 1e-4, "sin mismatch at {}", deg);
            assert!((a[1] - b[1]).abs() < 1e-4, "cos mismatch at {}", deg);
        }
    }

    #[test]
    fn test_push_angle_no_wrap_discontinuity() {
        let mut near_zero = Vec::new();
        let mut near_full = Vec::new();
        push_angle(&mut near_zero, 0.5);
        push_angle(&mut near_full, 359.5);
        assert!((near_zero[0] - near_full[0]).abs() < 0.02);
        assert!((near_zero[1] - near_full[1]).abs() < 0.02);
    }

    #[test]
    fn test_normalize_or_zero() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
        let v = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_frame_is_orthonormal() {
        for deg in [0.0, 30.0, 90.0, 200.0, 315.0] {
            let f = heading_forward(deg);
            let r = heading_right(deg);
            assert!((f.length() - 1.0).abs() < 1e-6);
            assert!((r.length() - 1.0).abs() < 1e-6);
            assert!(f.dot(r).abs() < 1e-6);
        }
    }
}
