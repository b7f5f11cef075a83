//! Cook-Torrance shading and debug-view compositing, CPU mirror of `fs_lighting`.

use std::f32::consts::PI;

use glam::{Vec3, Vec4, Vec4Swizzles};

use super::config::{DebugView, PipelineConfig};
use super::environment::Environment;
use super::gbuffer::GBufferTexel;
use crate::util::lerp;

/// Roughness floor inside the BRDF; keeps the GGX lobe finite.
pub const MIN_ROUGHNESS: f32 = 0.045;

pub fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

/// Schlick-GGX with the direct-lighting remap `k = (r + 1)² / 8`.
pub fn geometry_schlick_ggx(n_dot_x: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = (r * r) / 8.0;
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

pub fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

/// Inverse-square falloff.
pub fn attenuation(distance: f32) -> f32 {
    1.0 / (distance * distance).max(1e-4)
}

/// Reinhard tone map followed by gamma 2.2 encoding.
pub fn tone_map(color: Vec3) -> Vec3 {
    let mapped = color / (color + Vec3::ONE);
    mapped.powf(1.0 / 2.2)
}

/// Per-frame inputs shared by every pixel.
pub struct ShadingContext<'a> {
    pub config: &'a PipelineConfig,
    pub view_position: Vec3,
    pub environment: &'a dyn Environment,
}

/// Linear radiance leaving a covered texel towards the camera.
pub fn shade(texel: &GBufferTexel, ao: f32, ctx: &ShadingContext<'_>) -> Vec3 {
    let config = ctx.config;
    let material = &config.material;
    let position = texel.position.xyz();
    let albedo = texel.albedo.xyz();

    let n = texel.normal.xyz().normalize_or_zero();
    let v = (ctx.view_position - position).normalize_or_zero();
    let roughness = material.roughness().max(MIN_ROUGHNESS);
    let metallic = material.metallicity();
    let f0 = Vec3::splat(material.f0()).lerp(albedo, metallic);
    let n_dot_v = n.dot(v).max(0.0);

    let mut lo = Vec3::ZERO;
    for light in &config.lights {
        let to_light = light.position - position;
        let dist = to_light.length();
        let l = to_light / dist.max(1e-4);
        let h = (v + l).normalize_or_zero();
        let radiance = light.color().xyz() * config.light_intensity() * attenuation(dist);

        let n_dot_l = n.dot(l).max(0.0);
        let d = distribution_ggx(n.dot(h).max(0.0), roughness);
        let g = geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness);
        let f = fresnel_schlick(h.dot(v).max(0.0), f0);

        let specular = d * g * f / (4.0 * n_dot_v * n_dot_l + 1e-4);
        let kd = (Vec3::ONE - f) * (1.0 - metallic);
        lo += (kd * albedo / PI + specular) * radiance * n_dot_l;
    }

    let ao_factor = lerp(1.0, ao, config.ssao.visibility());
    let mut ambient = config.ambient_intensity() * albedo * ao_factor;
    if config.environment_specular() > 0.0 {
        let r = reflect(-v, n);
        let env = ctx.environment.radiance(r);
        ambient += env * fresnel_schlick(n_dot_v, f0) * config.environment_specular() * ao_factor;
    }

    ambient + lo
}

/// Output color of one screen pixel for the configured debug view.
/// Uncovered pixels are transparent black in the composite view.
pub fn compose(texel: &GBufferTexel, ao: f32, ctx: &ShadingContext<'_>) -> Vec4 {
    match ctx.config.debug_view {
        DebugView::Position => texel.position.xyz().extend(1.0),
        DebugView::Normal => texel.normal.xyz().extend(1.0),
        DebugView::Occlusion => Vec4::new(ao, ao, ao, 1.0),
        DebugView::Albedo => texel.albedo.xyz().extend(1.0),
        DebugView::Composite if !texel.is_covered() => Vec4::ZERO,
        DebugView::Composite => tone_map(shade(texel, ao, ctx)).extend(1.0),
    }
}

fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * n.dot(i) * n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::LightSource;
    use crate::pipeline::environment::UniformEnvironment;

    fn floor_texel(position: Vec3) -> GBufferTexel {
        GBufferTexel {
            position: position.extend(1.0),
            normal: Vec4::new(0.0, 1.0, 0.0, 0.0),
            albedo: Vec4::ONE,
            depth: 0.5,
        }
    }

    fn single_light(height: f32) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.lights = [
            LightSource::point(Vec3::new(0.0, height, 0.0), Vec3::ONE),
            LightSource::point(Vec3::new(0.0, -50.0, 0.0), Vec3::ZERO),
            LightSource::point(Vec3::new(0.0, -50.0, 0.0), Vec3::ZERO),
        ];
        config.set_ambient_intensity(0.0);
        config.set_environment_specular(0.0);
        config
    }

    #[test]
    fn test_inverse_square_falloff() {
        let env = UniformEnvironment(Vec3::ZERO);
        let texel = floor_texel(Vec3::ZERO);
        let near = single_light(1.0);
        let far = single_light(2.0);
        let view_position = Vec3::new(0.0, 5.0, 0.0);
        let a = shade(&texel, 1.0, &ShadingContext { config: &near, view_position, environment: &env });
        let b = shade(&texel, 1.0, &ShadingContext { config: &far, view_position, environment: &env });
        assert!((a.x / b.x - 4.0).abs() < 1e-3, "ratio {}", a.x / b.x);
    }

    #[test]
    fn test_lights_below_surface_contribute_nothing() {
        let env = UniformEnvironment(Vec3::ONE);
        let texel = floor_texel(Vec3::ZERO);
        let config = single_light(-1.0);
        let out = shade(&texel, 1.0, &ShadingContext { config: &config, view_position: Vec3::Y, environment: &env });
        assert_eq!(out, Vec3::ZERO);
    }

    #[test]
    fn test_occlusion_view_is_gray() {
        let env = UniformEnvironment(Vec3::ONE);
        let mut config = PipelineConfig::default();
        config.debug_view = DebugView::Occlusion;
        let ctx = ShadingContext { config: &config, view_position: Vec3::Y, environment: &env };
        let out = compose(&floor_texel(Vec3::ZERO), 0.3, &ctx);
        assert_eq!(out, Vec4::new(0.3, 0.3, 0.3, 1.0));
    }

    #[test]
    fn test_background_is_transparent() {
        let env = UniformEnvironment(Vec3::ONE);
        let config = PipelineConfig::default();
        let ctx = ShadingContext { config: &config, view_position: Vec3::Y, environment: &env };
        assert_eq!(compose(&GBufferTexel::CLEAR, 1.0, &ctx), Vec4::ZERO);
    }

    #[test]
    fn test_ambient_follows_occlusion_visibility() {
        let env = UniformEnvironment(Vec3::ZERO);
        let mut config = single_light(1.0);
        config.lights[0].set_color(Vec4::ZERO);
        config.set_ambient_intensity(0.5);
        let texel = floor_texel(Vec3::ZERO);
        let ctx = ShadingContext { config: &config, view_position: Vec3::Y, environment: &env };
        assert!(shade(&texel, 0.2, &ctx).abs_diff_eq(Vec3::splat(0.1), 1e-6));

        let mut hidden = config.clone();
        hidden.ssao.set_visibility(0.0);
        let ctx = ShadingContext { config: &hidden, view_position: Vec3::Y, environment: &env };
        assert!(shade(&texel, 0.2, &ctx).abs_diff_eq(Vec3::splat(0.5), 1e-6));
    }

    #[test]
    fn test_tone_map_stays_below_one() {
        let out = tone_map(Vec3::new(0.0, 1.0, 1000.0));
        assert_eq!(out.x, 0.0);
        assert!((out.y - 0.5f32.powf(1.0 / 2.2)).abs() < 1e-6);
        assert!(out.z < 1.0);
    }

    #[test]
    fn test_ggx_normalizes_at_peak() {
        // Rougher surfaces have a lower peak
        assert!(distribution_ggx(1.0, 0.2) > distribution_ggx(1.0, 0.8));
        assert!((geometry_schlick_ggx(1.0, 0.5) - 1.0).abs() < 1e-6);
        assert_eq!(fresnel_schlick(1.0, Vec3::splat(0.04)), Vec3::splat(0.04));
    }
}
