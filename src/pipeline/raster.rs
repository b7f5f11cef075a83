//! Row-major CPU images with the addressing modes the passes sample with.

use glam::Vec2;

use crate::util::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy> Raster<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::InvalidParameter {
                name: "raster",
                reason: format!("{} texels for {}x{}", data.len(), width, height),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Integer fetch with clamp-to-edge addressing. The raster must not be empty.
    pub fn load_clamped(&self, x: i64, y: i64) -> T {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// Integer fetch with repeat addressing. The raster must not be empty.
    pub fn load_wrapped(&self, x: i64, y: i64) -> T {
        let wx = x.rem_euclid(self.width as i64) as usize;
        let wy = y.rem_euclid(self.height as i64) as usize;
        self.data[wy * self.width + wx]
    }

    /// Nearest-texel lookup at normalized coordinates, clamp-to-edge.
    pub fn sample_clamped(&self, uv: Vec2) -> T {
        let x = (uv.x * self.width as f32).floor();
        let y = (uv.y * self.height as f32).floor();
        // NaN casts to 0, infinities saturate
        self.load_clamped(x as i64, y as i64)
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Raster<f32> {
        Raster::from_fn(4, 3, |x, y| (y * 4 + x) as f32)
    }

    #[test]
    fn test_clamped_addressing() {
        let r = ramp();
        assert_eq!(r.load_clamped(-5, -5), 0.0);
        assert_eq!(r.load_clamped(10, 0), 3.0);
        assert_eq!(r.load_clamped(10, 10), 11.0);
        assert_eq!(r.load_clamped(1, 1), 5.0);
    }

    #[test]
    fn test_wrapped_addressing() {
        let r = ramp();
        assert_eq!(r.load_wrapped(-1, 0), 3.0);
        assert_eq!(r.load_wrapped(4, 3), 0.0);
        assert_eq!(r.load_wrapped(5, -1), 9.0);
    }

    #[test]
    fn test_sample_clamped() {
        let r = ramp();
        assert_eq!(r.sample_clamped(Vec2::new(0.0, 0.0)), 0.0);
        assert_eq!(r.sample_clamped(Vec2::new(0.99, 0.99)), 11.0);
        assert_eq!(r.sample_clamped(Vec2::new(1.5, -0.5)), 3.0);
        assert_eq!(r.sample_clamped(Vec2::new(f32::NAN, 0.0)), 0.0);
    }

    #[test]
    fn test_from_vec_checks_len() {
        assert!(Raster::from_vec(2, 2, vec![0u8; 4]).is_ok());
        assert!(Raster::from_vec(2, 2, vec![0u8; 5]).is_err());
    }
}
