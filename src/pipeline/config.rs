//! Runtime-tunable pipeline parameters.
//!
//! [`PipelineConfig`] is owned by the frame driver and handed to every pass by
//! reference. Scalar parameters are private and only change through setters
//! that clamp into the range the shaders expect, so an out-of-range value from
//! the overlay or a config file never reaches the shading evaluation.

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::kernel::{MAX_KERNEL_SIZE, MAX_NOISE_SIZE};
use super::blur::MAX_BLUR_SIZE;
use super::timing::TimingPolicy;
use crate::util::{clamp_or_min, Error, Result};

/// Upper bound of the SSAO sample radius, world units.
pub const MAX_SSAO_RADIUS: f32 = 3.0;

/// Upper bound of the SSAO contrast exponent.
pub const MAX_SSAO_POWER: f32 = 4.0;

/// Uniform scale applied to the unit marker cube drawn at each light.
pub const MARKER_SCALE: f32 = 0.15;

/// Which buffer the compositor writes to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DebugView {
    /// Fully shaded frame
    #[default]
    Composite,
    /// World-space G-Buffer position
    Position,
    /// World-space G-Buffer normal
    Normal,
    /// Blurred occlusion, grayscale
    Occlusion,
    /// G-Buffer albedo
    Albedo,
}

impl DebugView {
    pub const ALL: [DebugView; 5] = [
        DebugView::Composite,
        DebugView::Position,
        DebugView::Normal,
        DebugView::Occlusion,
        DebugView::Albedo,
    ];

    /// Map the 1-based view index used by the number keys.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(Self::Composite),
            2 => Some(Self::Position),
            3 => Some(Self::Normal),
            4 => Some(Self::Occlusion),
            5 => Some(Self::Albedo),
            _ => None,
        }
    }

    /// 1-based index, as uploaded to the lighting shader.
    pub fn index(self) -> u32 {
        match self {
            Self::Composite => 1,
            Self::Position => 2,
            Self::Normal => 3,
            Self::Occlusion => 4,
            Self::Albedo => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Composite => "Composite",
            Self::Position => "Position",
            Self::Normal => "Normal",
            Self::Occlusion => "Occlusion",
            Self::Albedo => "Albedo",
        }
    }
}

/// Surface response shared by the whole scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialParameters {
    albedo: Vec3,
    roughness: f32,
    metallicity: f32,
    f0: f32,
}

impl Default for MaterialParameters {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            roughness: 0.5,
            metallicity: 0.0,
            f0: 0.658,
        }
    }
}

impl MaterialParameters {
    pub fn albedo(&self) -> Vec3 {
        self.albedo
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn metallicity(&self) -> f32 {
        self.metallicity
    }

    pub fn f0(&self) -> f32 {
        self.f0
    }

    /// Each channel clamped to [0, 1].
    pub fn set_albedo(&mut self, albedo: Vec3) {
        self.albedo = Vec3::new(
            clamp_or_min(albedo.x, 0.0, 1.0),
            clamp_or_min(albedo.y, 0.0, 1.0),
            clamp_or_min(albedo.z, 0.0, 1.0),
        );
    }

    pub fn set_roughness(&mut self, value: f32) {
        self.roughness = clamp_or_min(value, 0.0, 1.0);
    }

    pub fn set_metallicity(&mut self, value: f32) {
        self.metallicity = clamp_or_min(value, 0.0, 1.0);
    }

    pub fn set_f0(&mut self, value: f32) {
        self.f0 = clamp_or_min(value, 0.0, 1.0);
    }

    fn sanitized(self) -> Self {
        let mut out = Self::default();
        out.set_albedo(self.albedo);
        out.set_roughness(self.roughness);
        out.set_metallicity(self.metallicity);
        out.set_f0(self.f0);
        out
    }
}

/// Occlusion estimate and blur controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoParameters {
    kernel_size: u32,
    noise_size: u32,
    radius: f32,
    power: f32,
    blur_size: u32,
    visibility: f32,
}

impl Default for SsaoParameters {
    fn default() -> Self {
        Self {
            kernel_size: 64,
            noise_size: 4,
            radius: 1.0,
            power: 1.0,
            blur_size: 4,
            visibility: 1.0,
        }
    }
}

impl SsaoParameters {
    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    pub fn noise_size(&self) -> u32 {
        self.noise_size
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn blur_size(&self) -> u32 {
        self.blur_size
    }

    /// How strongly occlusion darkens the ambient term.
    pub fn visibility(&self) -> f32 {
        self.visibility
    }

    pub fn set_kernel_size(&mut self, value: u32) {
        self.kernel_size = value.min(MAX_KERNEL_SIZE as u32);
    }

    pub fn set_noise_size(&mut self, value: u32) {
        self.noise_size = value.min(MAX_NOISE_SIZE);
    }

    pub fn set_radius(&mut self, value: f32) {
        self.radius = clamp_or_min(value, 0.0, MAX_SSAO_RADIUS);
    }

    pub fn set_power(&mut self, value: f32) {
        self.power = clamp_or_min(value, 0.0, MAX_SSAO_POWER);
    }

    pub fn set_blur_size(&mut self, value: u32) {
        self.blur_size = value.min(MAX_BLUR_SIZE);
    }

    pub fn set_visibility(&mut self, value: f32) {
        self.visibility = clamp_or_min(value, 0.0, 1.0);
    }

    fn sanitized(self) -> Self {
        let mut out = Self::default();
        out.set_kernel_size(self.kernel_size);
        out.set_noise_size(self.noise_size);
        out.set_radius(self.radius);
        out.set_power(self.power);
        out.set_blur_size(self.blur_size);
        out.set_visibility(self.visibility);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightKind {
    #[default]
    Point,
}

/// One of the three scene lights; its marker is drawn at `position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub kind: LightKind,
    pub position: Vec3,
    color: Vec4,
}

impl LightSource {
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            color: color.extend(1.0),
        }
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Channels clamped to [0, 1]; the shared intensity scales them.
    pub fn set_color(&mut self, color: Vec4) {
        self.color = Vec4::new(
            clamp_or_min(color.x, 0.0, 1.0),
            clamp_or_min(color.y, 0.0, 1.0),
            clamp_or_min(color.z, 0.0, 1.0),
            clamp_or_min(color.w, 0.0, 1.0),
        );
    }
}

fn default_lights() -> [LightSource; 3] {
    [
        LightSource::point(Vec3::new(1.5, 0.75, 1.0), Vec3::X),
        LightSource::point(Vec3::new(-1.5, 1.0, 1.0), Vec3::Y),
        LightSource::point(Vec3::new(0.0, 0.75, -1.2), Vec3::Z),
    ]
}

/// A light entry as written in a config file; missing fields fall back to the
/// default light at the same index.
#[derive(Deserialize)]
struct LightPatch {
    kind: Option<LightKind>,
    position: Option<Vec3>,
    color: Option<Vec4>,
}

fn deserialize_lights<'de, D>(deserializer: D) -> std::result::Result<[LightSource; 3], D::Error>
where
    D: serde::Deserializer<'de>,
{
    let patches = Vec::<LightPatch>::deserialize(deserializer)?;
    let mut lights = default_lights();
    if patches.len() > lights.len() {
        return Err(serde::de::Error::invalid_length(
            patches.len(),
            &"at most 3 lights",
        ));
    }
    for (light, patch) in lights.iter_mut().zip(patches) {
        if let Some(kind) = patch.kind {
            light.kind = kind;
        }
        if let Some(position) = patch.position {
            light.position = position;
        }
        if let Some(color) = patch.color {
            light.color = color;
        }
    }
    Ok(lights)
}

/// Every value the passes read once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub material: MaterialParameters,
    pub ssao: SsaoParameters,
    #[serde(deserialize_with = "deserialize_lights")]
    pub lights: [LightSource; 3],
    pub debug_view: DebugView,
    light_intensity: f32,
    ambient_intensity: f32,
    environment_specular: f32,
    /// Seed for kernel and noise generation; `None` draws from entropy
    pub seed: Option<u64>,
    pub timing: TimingPolicy,
    pub wireframe: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            material: MaterialParameters::default(),
            ssao: SsaoParameters::default(),
            lights: default_lights(),
            debug_view: DebugView::Composite,
            light_intensity: 3.0,
            ambient_intensity: 0.15,
            environment_specular: 0.25,
            seed: None,
            timing: TimingPolicy::default(),
            wireframe: false,
        }
    }
}

impl PipelineConfig {
    /// Radiance scale shared by all lights.
    pub fn light_intensity(&self) -> f32 {
        self.light_intensity
    }

    pub fn ambient_intensity(&self) -> f32 {
        self.ambient_intensity
    }

    /// Weight of the cubemap reflection term; 0 disables it.
    pub fn environment_specular(&self) -> f32 {
        self.environment_specular
    }

    pub fn set_light_intensity(&mut self, value: f32) {
        self.light_intensity = clamp_or_min(value, 0.0, 100.0);
    }

    pub fn set_ambient_intensity(&mut self, value: f32) {
        self.ambient_intensity = clamp_or_min(value, 0.0, 1.0);
    }

    pub fn set_environment_specular(&mut self, value: f32) {
        self.environment_specular = clamp_or_min(value, 0.0, 1.0);
    }

    /// Select the debug view from its 1-based index; other values are ignored.
    pub fn set_debug_view_index(&mut self, index: u32) -> bool {
        match DebugView::from_index(index) {
            Some(view) => {
                self.debug_view = view;
                true
            }
            None => false,
        }
    }

    /// Re-apply every clamp, e.g. after deserializing.
    pub fn sanitized(mut self) -> Self {
        self.material = self.material.sanitized();
        self.ssao = self.ssao.sanitized();
        for light in &mut self.lights {
            let color = light.color;
            light.set_color(color);
        }
        let (li, ai, es) = (self.light_intensity, self.ambient_intensity, self.environment_specular);
        self.set_light_intensity(li);
        self.set_ambient_intensity(ai);
        self.set_environment_specular(es);
        self.timing = self.timing.sanitized();
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Light positions and colors, in index order.
    pub fn light(&self, index: usize) -> Result<&LightSource> {
        self.lights.get(index).ok_or(Error::InvalidParameter {
            name: "light",
            reason: format!("index {index} out of range 0..{}", self.lights.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.material.roughness(), 0.5);
        assert_eq!(config.material.metallicity(), 0.0);
        assert_eq!(config.ssao.kernel_size(), 64);
        assert_eq!(config.ssao.noise_size(), 4);
        assert_eq!(config.ssao.blur_size(), 4);
        assert_eq!(config.debug_view, DebugView::Composite);
        assert_eq!(config.lights[0].color(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(config.lights[1].color(), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(config.lights[2].color(), Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_material_clamping() {
        let mut m = MaterialParameters::default();
        m.set_roughness(1.7);
        m.set_metallicity(-0.2);
        m.set_f0(f32::NAN);
        assert_eq!(m.roughness(), 1.0);
        assert_eq!(m.metallicity(), 0.0);
        assert_eq!(m.f0(), 0.0);
        m.set_albedo(Vec3::new(2.0, -1.0, 0.5));
        assert_eq!(m.albedo(), Vec3::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn test_ssao_clamping() {
        let mut s = SsaoParameters::default();
        s.set_visibility(3.0);
        s.set_radius(7.5);
        s.set_power(-1.0);
        s.set_kernel_size(1000);
        s.set_noise_size(99);
        s.set_blur_size(40);
        assert_eq!(s.visibility(), 1.0);
        assert_eq!(s.radius(), MAX_SSAO_RADIUS);
        assert_eq!(s.power(), 0.0);
        assert_eq!(s.kernel_size(), 64);
        assert_eq!(s.noise_size(), 16);
        assert_eq!(s.blur_size(), 16);
    }

    #[test]
    fn test_debug_view_indices() {
        for view in DebugView::ALL {
            assert_eq!(DebugView::from_index(view.index()), Some(view));
        }
        assert_eq!(DebugView::from_index(4), Some(DebugView::Occlusion));
        assert_eq!(DebugView::from_index(0), None);
        assert_eq!(DebugView::from_index(6), None);

        let mut config = PipelineConfig::default();
        assert!(!config.set_debug_view_index(9));
        assert_eq!(config.debug_view, DebugView::Composite);
        assert!(config.set_debug_view_index(3));
        assert_eq!(config.debug_view, DebugView::Normal);
    }

    #[test]
    fn test_json_is_sanitized() {
        let json = r#"{
            "material": { "roughness": 4.0, "f0": -1.0 },
            "ssao": { "kernel_size": 512, "radius": 9.0 },
            "seed": 42
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.material.roughness(), 1.0);
        assert_eq!(config.material.f0(), 0.0);
        assert_eq!(config.ssao.kernel_size(), 64);
        assert_eq!(config.ssao.radius(), 3.0);
        assert_eq!(config.seed, Some(42));
        // untouched keys keep defaults
        assert_eq!(config.ssao.blur_size(), 4);
        assert_eq!(config.lights, PipelineConfig::default().lights);
    }

    #[test]
    fn test_json_roundtrip_preserves_values() {
        let mut config = PipelineConfig::default();
        config.material.set_roughness(0.25);
        config.ssao.set_power(2.0);
        config.debug_view = DebugView::Albedo;
        let text = config.to_json_string().unwrap();
        let back = PipelineConfig::from_json_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_light_entry_keeps_default_fields() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "lights": [{ "color": [0.5, 0.5, 0.5, 1.0] }] }"#).unwrap();
        let defaults = default_lights();
        assert_eq!(config.lights[0].position, defaults[0].position);
        assert_eq!(config.lights[0].color(), Vec4::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(config.lights[1], defaults[1]);
        assert_eq!(config.lights[2], defaults[2]);
    }

    #[test]
    fn test_too_many_lights_rejected() {
        let text = r#"{ "lights": [{}, {}, {}, {}] }"#;
        assert!(serde_json::from_str::<PipelineConfig>(text).is_err());
    }

    #[test]
    fn test_light_lookup() {
        let config = PipelineConfig::default();
        assert!(config.light(2).is_ok());
        assert!(matches!(config.light(3), Err(Error::InvalidParameter { .. })));
    }
}
