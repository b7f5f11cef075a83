//! SSAO sample kernel and rotation noise tile.
//!
//! Both are generated once at startup. The kernel is always built at full
//! size; the per-frame kernel size picks a prefix, so changing it in the
//! overlay never regenerates anything.

use glam::Vec3;
use half::f16;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::util::{lerp, Error, Result};

/// Largest kernel the occlusion shader accepts.
pub const MAX_KERNEL_SIZE: usize = 64;

/// Largest noise tiling divisor exposed to the overlay.
pub const MAX_NOISE_SIZE: u32 = 16;

/// Side of the square noise tile, in texels.
pub const NOISE_TILE_DIM: usize = 4;

/// Random source for kernel and noise: seeded when a seed is given, entropy otherwise.
pub fn sample_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Length scale of sample `index` in a kernel of `kernel_size`:
/// `lerp(0.1, 1.0, t²)` with `t = index / kernel_size`.
pub fn kernel_scale(index: usize, kernel_size: usize) -> f32 {
    if kernel_size == 0 {
        return 0.1;
    }
    let t = index as f32 / kernel_size as f32;
    lerp(0.1, 1.0, t * t)
}

/// Hemisphere offsets (z >= 0), biased toward the origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcclusionSampleKernel {
    samples: Vec<Vec3>,
}

impl OcclusionSampleKernel {
    pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self> {
        if size > MAX_KERNEL_SIZE {
            return Err(Error::KernelTooLarge { requested: size, max: MAX_KERNEL_SIZE });
        }

        let samples = (0..size)
            .map(|i| {
                let dir = Vec3::new(
                    rng.gen::<f32>() * 2.0 - 1.0,
                    rng.gen::<f32>() * 2.0 - 1.0,
                    rng.gen::<f32>(),
                );
                let dir = dir.try_normalize().unwrap_or(Vec3::Z);
                dir * rng.gen::<f32>() * kernel_scale(i, size)
            })
            .collect();

        Ok(Self { samples })
    }

    /// Full-size kernel from an optional seed.
    pub fn with_seed(seed: Option<u64>) -> Result<Self> {
        Self::generate(MAX_KERNEL_SIZE, &mut sample_rng(seed))
    }

    pub fn samples(&self) -> &[Vec3] {
        &self.samples
    }

    /// First `count` samples, capped at the kernel length.
    pub fn prefix(&self, count: usize) -> &[Vec3] {
        &self.samples[..count.min(self.samples.len())]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// 4x4 tangent-plane rotations (z = 0), sampled with wrap addressing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseTile {
    texels: [Vec3; NOISE_TILE_DIM * NOISE_TILE_DIM],
}

impl NoiseTile {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut texels = [Vec3::ZERO; NOISE_TILE_DIM * NOISE_TILE_DIM];
        for texel in &mut texels {
            *texel = Vec3::new(rng.gen::<f32>() * 2.0 - 1.0, rng.gen::<f32>() * 2.0 - 1.0, 0.0);
        }
        Self { texels }
    }

    pub fn texels(&self) -> &[Vec3] {
        &self.texels
    }

    /// Texel at integer coordinates, wrapping in both axes.
    pub fn texel_wrapped(&self, x: i64, y: i64) -> Vec3 {
        let dim = NOISE_TILE_DIM as i64;
        let (x, y) = (x.rem_euclid(dim) as usize, y.rem_euclid(dim) as usize);
        self.texels[y * NOISE_TILE_DIM + x]
    }

    /// Row-major RGBA16F texel data for upload.
    pub fn to_rgba_f16(&self) -> Vec<f16> {
        self.texels
            .iter()
            .flat_map(|t| [t.x, t.y, t.z, 0.0])
            .map(f16::from_f32)
            .collect()
    }
}

/// Kernel and noise drawn from one random stream, kernel first.
pub fn generate_occlusion_inputs(seed: Option<u64>) -> Result<(OcclusionSampleKernel, NoiseTile)> {
    let mut rng = sample_rng(seed);
    let kernel = OcclusionSampleKernel::generate(MAX_KERNEL_SIZE, &mut rng)?;
    let noise = NoiseTile::generate(&mut rng);
    tracing::debug!(seeded = seed.is_some(), "generated SSAO kernel and noise tile");
    Ok((kernel, noise))
}
