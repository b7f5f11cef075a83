//! End-to-end frames through the headless renderer

use glam::{Vec3, Vec4, Vec4Swizzles};
use glengine::pipeline::environment::{ProceduralSky, UniformEnvironment};
use glengine::pipeline::reference::{ReferenceCamera, ReferenceRenderer, ReferenceScene};
use glengine::pipeline::{DebugView, FrameStep, LightSource, PipelineConfig};

const SIZE: usize = 33;
const CENTER: usize = SIZE / 2;

/// Red, green and blue lights evenly spaced around the plane's center.
fn symmetric_lights() -> [LightSource; 3] {
    let colors = [Vec3::X, Vec3::Y, Vec3::Z];
    let mut lights = colors.map(|c| LightSource::point(Vec3::ZERO, c));
    for (i, light) in lights.iter_mut().enumerate() {
        let angle = (90.0 + 120.0 * i as f32).to_radians();
        light.position = Vec3::new(1.5 * angle.cos(), 1.0, 1.5 * angle.sin());
    }
    lights
}

fn overhead_camera() -> ReferenceCamera {
    ReferenceCamera::look_at(Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO, Vec3::NEG_Z, 45.0, 1.0)
}

fn render(config: &PipelineConfig, scene: &ReferenceScene) -> glengine::pipeline::reference::ReferenceFrame {
    let mut renderer = ReferenceRenderer::new(Some(7)).unwrap();
    renderer
        .render(config, scene, &overhead_camera(), &UniformEnvironment(Vec3::splat(0.2)), SIZE, SIZE)
        .unwrap()
}

#[test]
fn center_pixel_blends_all_three_lights() {
    let mut config = PipelineConfig::default();
    config.lights = symmetric_lights();
    config.material.set_roughness(0.5);
    config.material.set_metallicity(0.0);
    config.material.set_f0(0.04);
    config.set_environment_specular(0.0);

    let frame = render(&config, &ReferenceScene::plane(3.0));
    let center: Vec4 = frame.color.get(CENTER, CENTER).unwrap();
    let rgb = center.xyz();

    assert_eq!(center.w, 1.0);
    assert!(rgb.max_element() < 0.99, "saturated: {rgb}");
    assert!(rgb.min_element() > 0.05, "missing a light: {rgb}");
    assert!(rgb.max_element() / rgb.min_element() < 1.05, "one light dominates: {rgb}");
}

#[test]
fn moving_one_light_away_unbalances_the_center() {
    let mut config = PipelineConfig::default();
    config.lights = symmetric_lights();
    config.set_ambient_intensity(0.0);
    config.set_environment_specular(0.0);
    config.lights[0].position *= Vec3::new(4.0, 1.0, 4.0);

    let frame = render(&config, &ReferenceScene::plane(8.0));
    let c = frame.color.get(CENTER, CENTER).unwrap();
    assert!(c.x < c.y && c.x < c.z, "{c}");
}

#[test]
fn occlusion_view_is_gray_and_ignores_lights() {
    let mut config = PipelineConfig::default();
    config.lights = symmetric_lights();
    config.debug_view = DebugView::Occlusion;
    let first = render(&config, &ReferenceScene::default());

    for light in &mut config.lights {
        light.set_color(Vec4::new(1.0, 0.5, 0.0, 1.0));
    }
    let second = render(&config, &ReferenceScene::default());

    for y in 0..SIZE {
        for x in 0..SIZE {
            let texel = first.gbuffer.texel(x, y);
            // Skip the background and anything a light marker covers
            if !texel.is_covered() || first.depth.get(x, y) != Some(texel.depth) {
                continue;
            }
            let c = first.color.get(x, y).unwrap();
            assert!(c.x == c.y && c.y == c.z, "({x}, {y}) not gray: {c}");
            assert_eq!(second.color.get(x, y), Some(c));
        }
    }
}

#[test]
fn spheres_occlude_the_floor_around_them() {
    let config = PipelineConfig::default();
    let frame = render(&config, &ReferenceScene::default());
    let min = frame.blurred_occlusion.as_slice().iter().cloned().fold(1.0f32, f32::min);
    assert!(min < 0.95, "no occlusion found, min {min}");
    assert!(frame.blurred_occlusion.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn frame_steps_follow_the_mandatory_order() {
    let mut renderer = ReferenceRenderer::new(None).unwrap();
    let frame = renderer
        .render(
            &PipelineConfig::default(),
            &ReferenceScene::default(),
            &ReferenceCamera::default(),
            &ProceduralSky::default(),
            32,
            18,
        )
        .unwrap();
    assert_eq!(frame.steps, &FrameStep::ALL[..FrameStep::ALL.len() - 1]);
}

#[test]
fn frame_saves_as_png() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("frame.png");
    let frame = render(&PipelineConfig::default(), &ReferenceScene::default());
    frame.save_png(&path).unwrap();

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (SIZE as u32, SIZE as u32));
    assert_eq!(decoded, frame.to_rgba8());
}
