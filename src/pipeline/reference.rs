//! Headless frame renderer.
//!
//! Ray-casts an analytic scene into a [`GBufferImage`] and then runs the same
//! occlusion, blur, compositing and forward overlay math the GPU passes run,
//! step by step through a [`FrameScheduler`]. Used by the `reference`
//! subcommand and by the end-to-end tests, neither of which has a GPU.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
use image::RgbaImage;

use super::blur::box_blur;
use super::config::{PipelineConfig, MARKER_SCALE};
use super::environment::Environment;
use super::gbuffer::{GBufferImage, GBufferTexel, CLEAR_DEPTH};
use super::kernel::{generate_occlusion_inputs, NoiseTile, OcclusionSampleKernel};
use super::occlusion::{estimate_occlusion, OcclusionCamera};
use super::raster::Raster;
use super::schedule::{FrameScheduler, FrameStep};
use super::shading::{compose, ShadingContext};
use super::{FAR_PLANE, NEAR_PLANE};
use crate::util::{Aabb, Error, Result};

/// Analytic surfaces the reference scene is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Axis-aligned square facing `normal`
    Plane { center: Vec3, normal: Vec3, half_extent: f32 },
    Sphere { center: Vec3, radius: f32 },
}

impl Primitive {
    /// Nearest hit in front of `origin`: ray parameter and surface normal.
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
        match *self {
            Primitive::Plane { center, normal, half_extent } => {
                let denom = dir.dot(normal);
                if denom.abs() < 1e-6 {
                    return None;
                }
                let t = (center - origin).dot(normal) / denom;
                if t <= 0.0 {
                    return None;
                }
                let offset = origin + dir * t - center;
                let in_plane = offset - normal * offset.dot(normal);
                if in_plane.abs().max_element() > half_extent {
                    return None;
                }
                Some((t, normal))
            }
            Primitive::Sphere { center, radius } => {
                let oc = origin - center;
                let b = oc.dot(dir);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let t = if -b - sq > 0.0 { -b - sq } else { -b + sq };
                if t <= 0.0 {
                    return None;
                }
                let p = origin + dir * t;
                Some((t, (p - center) / radius))
            }
        }
    }
}

/// Surfaces drawn by the geometry fill; every one uses the material albedo.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceScene {
    pub primitives: Vec<Primitive>,
}

impl Default for ReferenceScene {
    fn default() -> Self {
        Self {
            primitives: vec![
                Primitive::Plane { center: Vec3::ZERO, normal: Vec3::Y, half_extent: 3.0 },
                Primitive::Sphere { center: Vec3::new(0.0, 0.6, 0.0), radius: 0.6 },
                Primitive::Sphere { center: Vec3::new(0.9, 0.3, 0.5), radius: 0.3 },
            ],
        }
    }
}

impl ReferenceScene {
    /// A single ground plane.
    pub fn plane(half_extent: f32) -> Self {
        Self {
            primitives: vec![Primitive::Plane { center: Vec3::ZERO, normal: Vec3::Y, half_extent }],
        }
    }

    fn trace(&self, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
        self.primitives
            .iter()
            .filter_map(|p| p.intersect(origin, dir))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

/// Pinhole camera with the same projection the viewer uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceCamera {
    pub position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for ReferenceCamera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 1.6, 4.0), Vec3::new(0.0, 0.4, 0.0), Vec3::Y, 45.0, 16.0 / 9.0)
    }
}

impl ReferenceCamera {
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, fov_degrees: f32, aspect: f32) -> Self {
        Self {
            position: eye,
            view: Mat4::look_at_rh(eye, target, up),
            projection: Mat4::perspective_rh(fov_degrees.to_radians(), aspect, NEAR_PLANE, FAR_PLANE),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space ray through normalized device coordinates `ndc`.
    pub fn ray(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let inv = self.view_proj().inverse();
        let near = inv.project_point3(ndc.extend(0.0));
        let far = inv.project_point3(ndc.extend(1.0));
        (near, (far - near).normalize_or_zero())
    }

    fn occlusion_camera(&self) -> OcclusionCamera {
        OcclusionCamera { view: self.view, projection: self.projection }
    }
}

/// Every intermediate target of one rendered frame.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    pub gbuffer: GBufferImage,
    pub occlusion: Raster<f32>,
    pub blurred_occlusion: Raster<f32>,
    /// Display-encoded color, what the window would show
    pub color: Raster<Vec4>,
    pub depth: Raster<f32>,
    pub steps: Vec<FrameStep>,
}

impl ReferenceFrame {
    pub fn to_rgba8(&self) -> RgbaImage {
        let (w, h) = (self.color.width() as u32, self.color.height() as u32);
        RgbaImage::from_fn(w, h, |x, y| {
            let c = self.color.get(x as usize, y as usize).unwrap_or(Vec4::ZERO);
            let c = (c.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
            image::Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
        })
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.to_rgba8().save_with_format(path, image::ImageFormat::Png)?;
        tracing::info!("wrote reference frame to {}", path.display());
        Ok(())
    }
}

/// Holds the occlusion kernel and noise across frames, like the GPU renderer.
#[derive(Debug, Clone)]
pub struct ReferenceRenderer {
    kernel: OcclusionSampleKernel,
    noise: NoiseTile,
    scheduler: FrameScheduler,
}

impl ReferenceRenderer {
    pub fn new(seed: Option<u64>) -> Result<Self> {
        let (kernel, noise) = generate_occlusion_inputs(seed)?;
        Ok(Self { kernel, noise, scheduler: FrameScheduler::new() })
    }

    pub fn kernel(&self) -> &OcclusionSampleKernel {
        &self.kernel
    }

    /// Render one frame of `scene` at `width`×`height`.
    pub fn render(
        &mut self,
        config: &PipelineConfig,
        scene: &ReferenceScene,
        camera: &ReferenceCamera,
        environment: &dyn Environment,
        width: usize,
        height: usize,
    ) -> Result<ReferenceFrame> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter {
                name: "resolution",
                reason: format!("{width}x{height} has no pixels"),
            });
        }
        let _span = tracing::info_span!("reference_frame", width, height).entered();
        let rays = Raster::from_fn(width, height, |x, y| {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
            );
            camera.ray(ndc)
        });

        self.scheduler.begin_frame();

        self.scheduler.record(FrameStep::GeometryFill)?;
        let gbuffer = fill_gbuffer(config, scene, camera, &rays);

        self.scheduler.record(FrameStep::OcclusionEstimate)?;
        let occlusion = estimate_occlusion(&gbuffer, &camera.occlusion_camera(), &self.kernel, &self.noise, &config.ssao);

        self.scheduler.record(FrameStep::OcclusionBlur)?;
        let blurred_occlusion = box_blur(&occlusion, config.ssao.blur_size());

        self.scheduler.record(FrameStep::Lighting)?;
        let ctx = ShadingContext { config, view_position: camera.position, environment };
        let mut color = Raster::from_fn(width, height, |x, y| {
            let ao = blurred_occlusion.get(x, y).unwrap_or(1.0);
            compose(&gbuffer.texel(x, y), ao, &ctx)
        });

        self.scheduler.record(FrameStep::DepthCopy)?;
        let mut depth = gbuffer.depth().clone();

        self.scheduler.record(FrameStep::MarkerDraw)?;
        draw_markers(config, camera, &rays, &mut color, &mut depth);

        self.scheduler.record(FrameStep::CubemapDraw)?;
        draw_environment(environment, &rays, &mut color, &depth);

        tracing::debug!(frame = self.scheduler.frame(), "reference frame complete");
        Ok(ReferenceFrame {
            gbuffer,
            occlusion,
            blurred_occlusion,
            color,
            depth,
            steps: self.scheduler.steps().to_vec(),
        })
    }
}

fn fill_gbuffer(
    config: &PipelineConfig,
    scene: &ReferenceScene,
    camera: &ReferenceCamera,
    rays: &Raster<(Vec3, Vec3)>,
) -> GBufferImage {
    let view_proj = camera.view_proj();
    let albedo = config.material.albedo().extend(1.0);
    let mut gbuffer = GBufferImage::new(rays.width(), rays.height());
    for y in 0..rays.height() {
        for x in 0..rays.width() {
            let Some((origin, dir)) = rays.get(x, y) else { continue };
            let Some((t, normal)) = scene.trace(origin, dir) else { continue };
            let p = origin + dir * t;
            let depth = view_proj.project_point3(p).z;
            if !(0.0..=CLEAR_DEPTH).contains(&depth) {
                continue;
            }
            gbuffer.write(x, y, GBufferTexel {
                position: p.extend(1.0),
                normal: normal.extend(0.0),
                albedo,
                depth,
            });
        }
    }
    gbuffer
}

fn draw_markers(
    config: &PipelineConfig,
    camera: &ReferenceCamera,
    rays: &Raster<(Vec3, Vec3)>,
    color: &mut Raster<Vec4>,
    depth: &mut Raster<f32>,
) {
    let view_proj = camera.view_proj();
    // Unit cube of half extent 0.5, scaled
    let boxes: Vec<(Aabb, Vec3)> = config
        .lights
        .iter()
        .map(|l| (Aabb::from_center(l.position, 0.5 * MARKER_SCALE), l.color().xyz()))
        .collect();

    for y in 0..rays.height() {
        for x in 0..rays.width() {
            let Some((origin, dir)) = rays.get(x, y) else { continue };
            for (aabb, rgb) in &boxes {
                let Some(t) = aabb.intersect_ray(origin, dir) else { continue };
                let z = view_proj.project_point3(origin + dir * t).z;
                if z < depth.get(x, y).unwrap_or(CLEAR_DEPTH) {
                    depth.set(x, y, z);
                    color.set(x, y, rgb.extend(1.0));
                }
            }
        }
    }
}

fn draw_environment(environment: &dyn Environment, rays: &Raster<(Vec3, Vec3)>, color: &mut Raster<Vec4>, depth: &Raster<f32>) {
    for y in 0..rays.height() {
        for x in 0..rays.width() {
            // Sky sits on the far plane with a less-equal test
            if depth.get(x, y).is_some_and(|d| d >= CLEAR_DEPTH) {
                if let Some((_, dir)) = rays.get(x, y) {
                    let radiance = environment.radiance(dir).max(Vec3::ZERO);
                    color.set(x, y, radiance.powf(1.0 / 2.2).extend(1.0));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::environment::{ProceduralSky, UniformEnvironment};

    #[test]
    fn test_sphere_and_plane_hits() {
        let sphere = Primitive::Sphere { center: Vec3::ZERO, radius: 1.0 };
        let (t, n) = sphere.intersect(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(n.abs_diff_eq(Vec3::Z, 1e-5));
        assert!(sphere.intersect(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z).is_none());

        let plane = Primitive::Plane { center: Vec3::ZERO, normal: Vec3::Y, half_extent: 1.0 };
        assert!(plane.intersect(Vec3::new(0.5, 2.0, 0.5), Vec3::NEG_Y).is_some());
        assert!(plane.intersect(Vec3::new(1.5, 2.0, 0.5), Vec3::NEG_Y).is_none());
        assert!(plane.intersect(Vec3::new(0.5, 2.0, 0.5), Vec3::Y).is_none());
    }

    #[test]
    fn test_frame_records_every_pass_in_order() {
        let mut renderer = ReferenceRenderer::new(Some(1)).unwrap();
        let config = PipelineConfig::default();
        let frame = renderer
            .render(&config, &ReferenceScene::default(), &ReferenceCamera::default(), &ProceduralSky::default(), 48, 27)
            .unwrap();
        assert_eq!(frame.steps, &FrameStep::ALL[..7]);
        assert_eq!(frame.color.width(), 48);
        assert_eq!(frame.to_rgba8().dimensions(), (48, 27));
    }

    #[test]
    fn test_sky_fills_uncovered_pixels() {
        let mut renderer = ReferenceRenderer::new(Some(2)).unwrap();
        let config = PipelineConfig::default();
        // Looking straight up: nothing but sky
        let camera = ReferenceCamera::look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 5.0, 0.0), Vec3::Z, 45.0, 1.0);
        let env = UniformEnvironment(Vec3::splat(0.25));
        let frame = renderer.render(&config, &ReferenceScene::plane(3.0), &camera, &env, 8, 8).unwrap();
        let expected = 0.25f32.powf(1.0 / 2.2);
        for c in frame.color.as_slice() {
            assert!((c.x - expected).abs() < 1e-5 && c.w == 1.0);
        }
        assert!(frame.gbuffer.positions().as_slice().iter().all(|p| p.w == 0.0));
    }

    #[test]
    fn test_marker_drawn_over_surface() {
        let mut renderer = ReferenceRenderer::new(Some(3)).unwrap();
        let mut config = PipelineConfig::default();
        for light in &mut config.lights {
            light.position = Vec3::new(0.0, 0.5, 0.0);
        }
        let camera = ReferenceCamera::look_at(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, Vec3::NEG_Z, 45.0, 1.0);
        let frame = renderer
            .render(&config, &ReferenceScene::plane(3.0), &camera, &UniformEnvironment(Vec3::ZERO), 33, 33)
            .unwrap();
        let center = frame.color.get(16, 16).unwrap();
        // Last light drawn at the same spot fails the depth test, first one wins
        assert_eq!(center, config.lights[0].color().xyz().extend(1.0));
        assert!(frame.depth.get(16, 16).unwrap() < frame.gbuffer.depth().get(16, 16).unwrap());
    }

    #[test]
    fn test_empty_resolution_rejected() {
        let mut renderer = ReferenceRenderer::new(Some(4)).unwrap();
        let result = renderer.render(
            &PipelineConfig::default(),
            &ReferenceScene::default(),
            &ReferenceCamera::default(),
            &UniformEnvironment(Vec3::ZERO),
            0,
            10,
        );
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
