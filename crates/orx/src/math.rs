//! # Math Types
//!
//! Plain data shared by frames and bodies.

use std::ops::{Add, Mul, Sub};

/// 3D vector. Frames treat X/Y as the plane and Z as depth.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Vector {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit scale.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Rotates the X/Y part by `angle` radians, Z is kept.
    #[inline]
    #[must_use]
    pub fn rotated_2d(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    /// Component-wise product.
    #[inline]
    #[must_use]
    pub fn scaled(self, scale: Self) -> Self {
        Self::new(self.x * scale.x, self.y * scale.y, self.z * scale.z)
    }

    /// Returns the squared distance to another vector.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let delta = self - other;
        delta.x * delta.x + delta.y * delta.y + delta.z * delta.z
    }
}

impl Add for Vector {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vector {
    type Output = Self;

    #[inline]
    fn mul(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}
