//! Environment radiance for the cubemap pass and the specular term.
//!
//! The GPU path uploads six `Rgba16Float` faces; the CPU reference renderer
//! samples the same data through the [`Environment`] trait.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3, Vec4};
use half::f16;
use image::{DynamicImage, GenericImageView, ImageReader};

use crate::util::{Error, Result};

/// Anything that returns linear radiance for a world-space direction.
pub trait Environment {
    fn radiance(&self, direction: Vec3) -> Vec3;
}

/// Cube faces in layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn layer(self) -> usize {
        self as usize
    }

    /// File name (without extension) the face is loaded from.
    pub fn file_stem(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "right",
            CubeFace::NegativeX => "left",
            CubeFace::PositiveY => "top",
            CubeFace::NegativeY => "bottom",
            CubeFace::PositiveZ => "back",
            CubeFace::NegativeZ => "front",
        }
    }

    /// Unnormalized direction through face coordinates `st` in [0, 1]²,
    /// with `t` growing downwards in the image.
    pub fn direction(self, st: Vec2) -> Vec3 {
        let a = st.x * 2.0 - 1.0;
        let b = st.y * 2.0 - 1.0;
        match self {
            CubeFace::PositiveX => Vec3::new(1.0, -b, -a),
            CubeFace::NegativeX => Vec3::new(-1.0, -b, a),
            CubeFace::PositiveY => Vec3::new(a, 1.0, b),
            CubeFace::NegativeY => Vec3::new(a, -1.0, -b),
            CubeFace::PositiveZ => Vec3::new(a, -b, 1.0),
            CubeFace::NegativeZ => Vec3::new(-a, -b, -1.0),
        }
    }

    /// Face hit by `direction` and the coordinates on it; inverse of [`CubeFace::direction`].
    pub fn locate(direction: Vec3) -> (CubeFace, Vec2) {
        let abs = direction.abs();
        let (face, a, b) = if abs.x >= abs.y && abs.x >= abs.z {
            let m = abs.x.max(f32::MIN_POSITIVE);
            if direction.x > 0.0 {
                (CubeFace::PositiveX, -direction.z / m, -direction.y / m)
            } else {
                (CubeFace::NegativeX, direction.z / m, -direction.y / m)
            }
        } else if abs.y >= abs.z {
            let m = abs.y.max(f32::MIN_POSITIVE);
            if direction.y > 0.0 {
                (CubeFace::PositiveY, direction.x / m, direction.z / m)
            } else {
                (CubeFace::NegativeY, direction.x / m, -direction.z / m)
            }
        } else {
            let m = abs.z.max(f32::MIN_POSITIVE);
            if direction.z > 0.0 {
                (CubeFace::PositiveZ, direction.x / m, -direction.y / m)
            } else {
                (CubeFace::NegativeZ, -direction.x / m, -direction.y / m)
            }
        };
        (face, Vec2::new((a + 1.0) * 0.5, (b + 1.0) * 0.5))
    }
}

/// Constant radiance in every direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformEnvironment(pub Vec3);

impl Environment for UniformEnvironment {
    fn radiance(&self, _direction: Vec3) -> Vec3 {
        self.0
    }
}

/// Gradient sky with a sun disc, used when no cubemap directory is given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProceduralSky {
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub ground: Vec3,
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
}

impl Default for ProceduralSky {
    fn default() -> Self {
        Self {
            zenith: Vec3::new(0.18, 0.32, 0.62),
            horizon: Vec3::new(0.72, 0.78, 0.86),
            ground: Vec3::new(0.22, 0.2, 0.18),
            sun_direction: Vec3::new(0.4, 0.6, -0.7).normalize(),
            sun_color: Vec3::new(4.0, 3.6, 3.0),
        }
    }
}

impl Environment for ProceduralSky {
    fn radiance(&self, direction: Vec3) -> Vec3 {
        let dir = direction.normalize_or_zero();
        let base = if dir.y >= 0.0 {
            self.horizon.lerp(self.zenith, dir.y.sqrt())
        } else {
            self.horizon.lerp(self.ground, (-dir.y * 4.0).min(1.0))
        };
        let sun = dir.dot(self.sun_direction).max(0.0).powf(512.0);
        base + self.sun_color * sun
    }
}

/// Six square faces of linear RGBA radiance.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapFaces {
    size: u32,
    faces: [Vec<Vec4>; 6],
}

impl CubemapFaces {
    /// Bake `environment` into faces of `size`² texels.
    pub fn from_environment(environment: &dyn Environment, size: u32) -> Self {
        let size = size.max(1);
        let faces = CubeFace::ALL.map(|face| {
            let mut texels = Vec::with_capacity((size * size) as usize);
            for y in 0..size {
                for x in 0..size {
                    let st = (Vec2::new(x as f32, y as f32) + 0.5) / size as f32;
                    texels.push(environment.radiance(face.direction(st)).extend(1.0));
                }
            }
            texels
        });
        Self { size, faces }
    }

    /// Load `right`, `left`, `top`, `bottom`, `back` and `front` from `dir`.
    /// Any extension the image decoders understand is accepted; LDR images
    /// are converted from sRGB to linear.
    pub fn load(dir: &Path) -> Result<Self> {
        let _span = tracing::info_span!("load_cubemap", dir = %dir.display()).entered();
        let mut size = None;
        let mut faces: [Vec<Vec4>; 6] = Default::default();

        for face in CubeFace::ALL {
            let path = find_face_file(dir, face.file_stem())?;
            let img = ImageReader::open(&path)?.decode()?;
            let (w, h) = img.dimensions();
            if w != h {
                return Err(Error::Cubemap { path, reason: format!("face is {w}x{h}, expected square") });
            }
            match size {
                None => size = Some(w),
                Some(s) if s != w => {
                    return Err(Error::Cubemap { path, reason: format!("face is {w}px, other faces are {s}px") });
                }
                Some(_) => {}
            }
            faces[face.layer()] = linear_texels(&img);
            tracing::debug!(face = face.file_stem(), path = %path.display(), "loaded cubemap face");
        }

        let size = size.unwrap_or(0);
        tracing::info!(size, "loaded cubemap");
        Ok(Self { size, faces })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: CubeFace) -> &[Vec4] {
        &self.faces[face.layer()]
    }

    /// Layer-major RGBA16F data, ready for a 6-layer texture upload.
    pub fn to_rgba_f16(&self) -> Vec<f16> {
        self.faces
            .iter()
            .flat_map(|texels| texels.iter().flat_map(|t| t.to_array()))
            .map(f16::from_f32)
            .collect()
    }
}

impl Environment for CubemapFaces {
    fn radiance(&self, direction: Vec3) -> Vec3 {
        if self.size == 0 {
            return Vec3::ZERO;
        }
        let (face, st) = CubeFace::locate(direction);
        let max = self.size as i64 - 1;
        let x = ((st.x * self.size as f32).floor() as i64).clamp(0, max) as usize;
        let y = ((st.y * self.size as f32).floor() as i64).clamp(0, max) as usize;
        self.faces[face.layer()][y * self.size as usize + x].truncate()
    }
}

fn find_face_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::Cubemap {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.file_stem().is_some_and(|s| s.eq_ignore_ascii_case(stem)))
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| Error::Cubemap {
        path: dir.join(stem),
        reason: "face image not found".into(),
    })
}

fn linear_texels(img: &DynamicImage) -> Vec<Vec4> {
    let hdr = matches!(img, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_));
    img.to_rgba32f()
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            if hdr {
                Vec4::new(r, g, b, a)
            } else {
                Vec4::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a)
            }
        })
        .collect()
}

/// sRGB transfer function, inverse.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_direction_round_trip() {
        for face in CubeFace::ALL {
            for st in [Vec2::new(0.25, 0.75), Vec2::new(0.5, 0.5), Vec2::new(0.9, 0.1)] {
                let (found, back) = CubeFace::locate(face.direction(st));
                assert_eq!(found, face);
                assert!(back.abs_diff_eq(st, 1e-5), "{face:?} {st} -> {back}");
            }
        }
    }

    #[test]
    fn test_face_centers_point_along_axes() {
        let center = Vec2::splat(0.5);
        assert_eq!(CubeFace::PositiveX.direction(center), Vec3::X);
        assert_eq!(CubeFace::NegativeY.direction(center), Vec3::NEG_Y);
        assert_eq!(CubeFace::NegativeZ.direction(center), Vec3::NEG_Z);
        // Top of the +Z face is +Y
        assert!(CubeFace::PositiveZ.direction(Vec2::new(0.5, 0.0)).y > 0.0);
    }

    #[test]
    fn test_sky_is_brighter_above() {
        let sky = ProceduralSky::default();
        let up = sky.radiance(Vec3::Y);
        let down = sky.radiance(Vec3::NEG_Y);
        assert!(up.z > down.z);
        let sun = sky.radiance(sky.sun_direction);
        assert!(sun.x > up.x);
    }

    #[test]
    fn test_baked_faces_sample_back() {
        let sky = ProceduralSky::default();
        let faces = CubemapFaces::from_environment(&sky, 16);
        assert_eq!(faces.size(), 16);
        assert_eq!(faces.to_rgba_f16().len(), 6 * 16 * 16 * 4);
        let dir = Vec3::new(0.1, 0.2, -1.0);
        assert!(faces.radiance(dir).abs_diff_eq(sky.radiance(dir), 0.1));
    }

    #[test]
    fn test_srgb_curve() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 1e-3);
    }
}
