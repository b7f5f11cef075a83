//! CPU G-Buffer with the same layout the geometry pass writes on the GPU.

use glam::Vec4;

use super::raster::Raster;

/// Depth of a texel nothing was drawn into.
pub const CLEAR_DEPTH: f32 = 1.0;

/// Everything the geometry pass stores for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GBufferTexel {
    /// World-space position, w = 1 where geometry was written
    pub position: Vec4,
    /// World-space normal, w unused
    pub normal: Vec4,
    pub albedo: Vec4,
    /// Normalized device depth in [0, 1]
    pub depth: f32,
}

impl GBufferTexel {
    pub const CLEAR: Self = Self {
        position: Vec4::ZERO,
        normal: Vec4::ZERO,
        albedo: Vec4::ZERO,
        depth: CLEAR_DEPTH,
    };

    pub fn is_covered(&self) -> bool {
        self.position.w != 0.0
    }
}

/// Position, normal, albedo and depth targets of identical size.
#[derive(Debug, Clone, PartialEq)]
pub struct GBufferImage {
    position: Raster<Vec4>,
    normal: Raster<Vec4>,
    albedo: Raster<Vec4>,
    depth: Raster<f32>,
}

impl GBufferImage {
    /// Cleared targets: zero color, depth at the far plane.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            position: Raster::new(width, height, Vec4::ZERO),
            normal: Raster::new(width, height, Vec4::ZERO),
            albedo: Raster::new(width, height, Vec4::ZERO),
            depth: Raster::new(width, height, CLEAR_DEPTH),
        }
    }

    pub fn width(&self) -> usize {
        self.position.width()
    }

    pub fn height(&self) -> usize {
        self.position.height()
    }

    pub fn texel(&self, x: usize, y: usize) -> GBufferTexel {
        match (self.position.get(x, y), self.normal.get(x, y), self.albedo.get(x, y), self.depth.get(x, y)) {
            (Some(position), Some(normal), Some(albedo), Some(depth)) => GBufferTexel { position, normal, albedo, depth },
            _ => GBufferTexel::CLEAR,
        }
    }

    pub fn write(&mut self, x: usize, y: usize, texel: GBufferTexel) {
        self.position.set(x, y, texel.position);
        self.normal.set(x, y, texel.normal);
        self.albedo.set(x, y, texel.albedo);
        self.depth.set(x, y, texel.depth);
    }

    pub fn positions(&self) -> &Raster<Vec4> {
        &self.position
    }

    pub fn normals(&self) -> &Raster<Vec4> {
        &self.normal
    }

    pub fn albedo(&self) -> &Raster<Vec4> {
        &self.albedo
    }

    pub fn depth(&self) -> &Raster<f32> {
        &self.depth
    }

    /// Fraction of texels covered by geometry.
    pub fn coverage(&self) -> f32 {
        let total = self.position.as_slice().len();
        if total == 0 {
            return 0.0;
        }
        let covered = self.position.as_slice().iter().filter(|p| p.w != 0.0).count();
        covered as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_state() {
        let g = GBufferImage::new(3, 2);
        assert_eq!(g.texel(1, 1), GBufferTexel::CLEAR);
        assert!(!g.texel(0, 0).is_covered());
        assert_eq!(g.coverage(), 0.0);
    }

    #[test]
    fn test_write_and_read() {
        let mut g = GBufferImage::new(3, 2);
        let texel = GBufferTexel {
            position: Vec4::new(1.0, 2.0, 3.0, 1.0),
            normal: Vec4::new(0.0, 1.0, 0.0, 0.0),
            albedo: Vec4::ONE,
            depth: 0.25,
        };
        g.write(2, 1, texel);
        assert_eq!(g.texel(2, 1), texel);
        assert!(g.texel(2, 1).is_covered());
        assert!((g.coverage() - 1.0 / 6.0).abs() < 1e-6);
        // out of range reads come back cleared
        assert_eq!(g.texel(5, 5), GBufferTexel::CLEAR);
    }
}
