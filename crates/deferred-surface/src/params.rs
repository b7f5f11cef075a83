//! Uniform blocks for the deferred passes
//!
//! Every struct mirrors a WGSL declaration byte for byte. Scalars are packed
//! into vec4 slots so the host and WGSL layouts never need implicit padding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, UVec4, Vec3, Vec4};

/// Largest kernel the occlusion shader iterates over
pub const MAX_KERNEL_SIZE: usize = 64;

/// Number of point lights the compositor evaluates
pub const LIGHT_COUNT: usize = 3;

/// `Camera` in camera.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub sky_view_proj: Mat4,
    pub position: Vec4,
}

impl CameraUniform {
    pub fn new(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        // Environment cube follows the camera: keep rotation, drop translation
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(view));
        Self {
            view_proj: projection * view,
            view,
            projection,
            sky_view_proj: projection * rotation_only,
            position: position.extend(1.0),
        }
    }
}

/// `ModelData` in gbuffer.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    pub albedo: Vec4,
}

impl ModelUniform {
    pub fn new(model: Mat4, albedo: Vec3) -> Self {
        Self {
            model,
            normal_matrix: model.inverse().transpose(),
            albedo: albedo.extend(1.0),
        }
    }
}

/// `SsaoParams` in ssao.wgsl, rewritten every frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SsaoUniform {
    pub view: Mat4,
    pub projection: Mat4,
    /// x: radius, y: power, z: depth bias
    pub shape: Vec4,
    /// x: kernel size, y: noise size, z: blur size
    pub counts: UVec4,
    /// xy: viewport size, zw: inverse viewport size
    pub viewport: Vec4,
}

/// `Kernel` in ssao.wgsl, uploaded once at startup
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct KernelUniform {
    pub samples: [Vec4; MAX_KERNEL_SIZE],
}

impl KernelUniform {
    /// Packs up to [`MAX_KERNEL_SIZE`] offsets; the remainder stays zero.
    pub fn from_samples(samples: &[Vec3]) -> Self {
        let mut out = Self::zeroed();
        for (slot, sample) in out.samples.iter_mut().zip(samples) {
            *slot = sample.extend(0.0);
        }
        out
    }
}

/// `BlurParams` in ssao_blur.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BlurUniform {
    /// x: blur size
    pub size: UVec4,
}

/// `Light` in lighting.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightUniform {
    pub position: Vec4,
    pub color: Vec4,
}

/// `LightingParams` in lighting.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightingUniform {
    pub view_position: Vec4,
    /// x: roughness, y: metallicity, z: f0, w: occlusion visibility
    pub material: Vec4,
    /// x: ambient intensity, y: environment specular, z: light intensity
    pub shading: Vec4,
    /// x: debug view index
    pub mode: UVec4,
    pub lights: [LightUniform; LIGHT_COUNT],
}

/// Per-instance data for a light marker cube
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MarkerInstance {
    pub fn new(position: Vec3, scale: f32, color: Vec4) -> Self {
        let model = Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(scale));
        Self {
            model: model.to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sky_matrix_ignores_translation() {
        let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let moved = Mat4::look_at_rh(Vec3::new(13.0, 12.0, 15.0), Vec3::new(10.0, 10.0, 10.0), Vec3::Y);
        let projection = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
        let a = CameraUniform::new(view, projection, Vec3::ZERO);
        let b = CameraUniform::new(moved, projection, Vec3::ZERO);
        assert!(a.sky_view_proj.abs_diff_eq(b.sky_view_proj, 1e-5));
    }

    #[test]
    fn test_kernel_padding() {
        let packed = KernelUniform::from_samples(&[Vec3::X, Vec3::Y]);
        assert_eq!(packed.samples[0], Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(packed.samples[1], Vec4::new(0.0, 1.0, 0.0, 0.0));
        assert!(packed.samples[2..].iter().all(|s| *s == Vec4::ZERO));
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniform = ModelUniform::new(model, Vec3::ONE);
        let n = uniform.normal_matrix.transform_vector3(Vec3::new(1.0, 1.0, 0.0)).normalize();
        let tangent = model.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(n.dot(tangent).abs() < 1e-5);
    }
}
