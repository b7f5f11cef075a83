//! Ambient occlusion estimate, CPU mirror of `fs_ssao`.
//!
//! For each covered pixel the view-space normal and the tiled noise vector
//! span a tangent frame; each kernel sample is placed around the fragment,
//! projected back to the screen, and counted as occluded when the G-Buffer
//! surface at that spot sits in front of it.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use super::config::SsaoParameters;
use super::gbuffer::GBufferImage;
use super::kernel::{NoiseTile, OcclusionSampleKernel, NOISE_TILE_DIM};
use super::raster::Raster;
use crate::util::smoothstep;

/// View-space depth margin before a sample counts as occluded.
pub const OCCLUSION_BIAS: f32 = 0.025;

/// Camera matrices the estimate reprojects with.
#[derive(Debug, Clone, Copy)]
pub struct OcclusionCamera {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Raw occlusion factor per pixel, 1 = fully visible.
pub fn estimate_occlusion(
    gbuffer: &GBufferImage,
    camera: &OcclusionCamera,
    kernel: &OcclusionSampleKernel,
    noise: &NoiseTile,
    params: &SsaoParameters,
) -> Raster<f32> {
    let (width, height) = (gbuffer.width(), gbuffer.height());
    let samples = kernel.prefix(params.kernel_size() as usize);
    let noise_size = params.noise_size().max(1) as f32;
    let viewport = Vec2::new(width as f32, height as f32);

    Raster::from_fn(width, height, |x, y| {
        let texel = gbuffer.texel(x, y);
        if !texel.is_covered() || samples.is_empty() {
            return 1.0;
        }

        let frag_pos = camera.view.transform_point3(texel.position.xyz());
        let normal = match camera.view.transform_vector3(texel.normal.xyz()).try_normalize() {
            Some(n) => n,
            None => return 1.0,
        };

        // Same lookup as a nearest/repeat sampler at uv * viewport / noise_size
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / viewport;
        let noise_coord = (uv * viewport / noise_size * NOISE_TILE_DIM as f32).floor();
        let random_vec = noise.texel_wrapped(noise_coord.x as i64, noise_coord.y as i64);

        let (tangent, bitangent) = tangent_frame(normal, random_vec);

        let radius = params.radius();
        let mut occlusion = 0.0;
        for s in samples {
            let offset = tangent * s.x + bitangent * s.y + normal * s.z;
            let sample_pos = frag_pos + offset * radius;
            let clip = camera.projection * sample_pos.extend(1.0);
            let ndc = clip.xy() / clip.w;
            let sample_uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);

            let neighbour = gbuffer.positions().sample_clamped(sample_uv);
            if neighbour.w == 0.0 {
                continue;
            }
            let sample_depth = camera.view.transform_point3(neighbour.xyz()).z;
            let range_check = smoothstep(0.0, 1.0, radius / (frag_pos.z - sample_depth).abs().max(1e-4));
            if sample_depth >= sample_pos.z + OCCLUSION_BIAS {
                occlusion += range_check;
            }
        }

        let visibility = 1.0 - occlusion / samples.len() as f32;
        visibility.max(1e-6).powf(params.power())
    })
}

/// Gram-Schmidt tangent and bitangent around `normal`. A noise vector
/// parallel to the normal falls back to a fixed perpendicular axis.
pub fn tangent_frame(normal: Vec3, random_vec: Vec3) -> (Vec3, Vec3) {
    let projected = random_vec - normal * random_vec.dot(normal);
    let tangent = if projected.length() < 1e-4 {
        any_orthogonal(normal)
    } else {
        projected.normalize()
    };
    (tangent, normal.cross(tangent))
}

fn any_orthogonal(n: Vec3) -> Vec3 {
    if n.x.abs() > 0.9 {
        n.cross(Vec3::Y).normalize()
    } else {
        n.cross(Vec3::X).normalize()
    }
}
