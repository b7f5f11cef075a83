//! Math re-exports and small numeric helpers.

pub use glam::{Mat3, Mat4, Quat, UVec4, Vec2, Vec3, Vec4};

use std::fmt;

/// Linear interpolation, exact at both ends: `lerp(x, y, 0) == x`, `lerp(x, y, 1) == y`.
#[inline]
pub fn lerp(x: f32, y: f32, a: f32) -> f32 {
    (1.0 - a) * x + a * y
}

/// Hermite step between `edge0` and `edge1`, matching WGSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Clamp into `[lo, hi]`; NaN collapses to `lo`.
#[inline]
pub fn clamp_or_min(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

/// Axis-aligned box.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new box from min and max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube of side `2 * half_extent` around `center`.
    #[inline]
    pub fn from_center(center: Vec3, half_extent: f32) -> Self {
        Self {
            min: center - Vec3::splat(half_extent),
            max: center + Vec3::splat(half_extent),
        }
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Nearest non-negative ray parameter hitting the box (slab test).
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let inv = dir.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        if far < 0.0 || near > far || near.is_nan() || far.is_nan() {
            return None;
        }
        Some(near.max(0.0))
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}
