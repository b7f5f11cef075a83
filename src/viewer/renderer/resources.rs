//! GPU-side resources used by the renderer: render targets, meshes and the
//! full-screen quad.

use deferred_surface::{MeshData, QUAD_VERTICES};
use wgpu::util::DeviceExt;

use crate::{Error, Result};

/// World-space position, w = 1 where geometry was written
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// World-space normal
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Raw and blurred occlusion, single channel
pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
/// Presented color. Not sRGB: the lighting and sky shaders gamma-encode.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Blend state of every color target. Each pass overwrites what it draws,
/// so position can stay Rgba32Float, which WebGPU does not guarantee to blend.
pub const TARGET_BLEND: Option<wgpu::BlendState> = None;

/// One texture plus its default view.
#[derive(Debug)]
pub struct RenderTarget {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { _texture: texture, view, format }
    }

    /// Attachment that later passes read from.
    fn sampled(device: &wgpu::Device, label: &str, size: (u32, u32), format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }
}

/// Format capabilities the device validates against. Without
/// `TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES` a full WebGPU device only
/// allows the guaranteed set, even when the adapter offers more.
pub fn format_features(
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
) -> wgpu::TextureFormatFeatures {
    let adapter_specific = device
        .features()
        .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
    let downlevel = !adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::WEBGPU_TEXTURE_FORMAT_SUPPORT);
    if adapter_specific || downlevel {
        adapter.get_texture_format_features(format)
    } else {
        format.guaranteed_format_features(device.features())
    }
}

/// What keeps `features` from serving as a sampled attachment, if anything.
pub fn attachment_problem(features: &wgpu::TextureFormatFeatures, blended: bool) -> Option<&'static str> {
    let required = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    if !features.allowed_usages.contains(required) {
        Some("not renderable and sampleable")
    } else if blended && !features.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE) {
        Some("not blendable")
    } else {
        None
    }
}

/// Refuse formats the passes cannot render to, sample from or blend into.
pub fn check_attachment_format(
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    name: &str,
    format: wgpu::TextureFormat,
) -> Result<()> {
    let blended = TARGET_BLEND.is_some() && !format.is_depth_stencil_format();
    match attachment_problem(&format_features(adapter, device, format), blended) {
        None => Ok(()),
        Some(problem) => {
            let message = format!("{name} target format {format:?} is {problem} on this device");
            tracing::error!("{message}");
            Err(Error::incomplete(message))
        }
    }
}

/// Geometry pass outputs.
#[derive(Debug)]
pub struct GBufferTargets {
    pub position: RenderTarget,
    pub normal: RenderTarget,
    pub albedo: RenderTarget,
    pub depth: RenderTarget,
    pub size: (u32, u32),
}

impl GBufferTargets {
    pub fn new(adapter: &wgpu::Adapter, device: &wgpu::Device, size: (u32, u32)) -> Result<Self> {
        for (name, format) in [
            ("position", POSITION_FORMAT),
            ("normal", NORMAL_FORMAT),
            ("albedo", ALBEDO_FORMAT),
            ("depth", DEPTH_FORMAT),
        ] {
            check_attachment_format(adapter, device, name, format)?;
        }
        Ok(Self {
            position: RenderTarget::sampled(device, "gbuffer_position", size, POSITION_FORMAT),
            normal: RenderTarget::sampled(device, "gbuffer_normal", size, NORMAL_FORMAT),
            albedo: RenderTarget::sampled(device, "gbuffer_albedo", size, ALBEDO_FORMAT),
            depth: RenderTarget::sampled(device, "gbuffer_depth", size, DEPTH_FORMAT),
            size,
        })
    }
}

/// Occlusion pass outputs.
#[derive(Debug)]
pub struct OcclusionTargets {
    pub raw: RenderTarget,
    pub blurred: RenderTarget,
}

impl OcclusionTargets {
    pub fn new(adapter: &wgpu::Adapter, device: &wgpu::Device, size: (u32, u32)) -> Result<Self> {
        check_attachment_format(adapter, device, "occlusion", OCCLUSION_FORMAT)?;
        Ok(Self {
            raw: RenderTarget::sampled(device, "ssao_raw", size, OCCLUSION_FORMAT),
            blurred: RenderTarget::sampled(device, "ssao_blurred", size, OCCLUSION_FORMAT),
        })
    }
}

/// Color the lighting and forward passes draw into, shown by egui, plus the
/// depth buffer the forward passes test against.
#[derive(Debug)]
pub struct OutputTargets {
    pub color: RenderTarget,
    pub depth: RenderTarget,
    pub size: (u32, u32),
}

impl OutputTargets {
    pub fn new(adapter: &wgpu::Adapter, device: &wgpu::Device, size: (u32, u32)) -> Result<Self> {
        check_attachment_format(adapter, device, "output", OUTPUT_FORMAT)?;
        Ok(Self {
            color: RenderTarget::sampled(device, "output_color", size, OUTPUT_FORMAT),
            depth: RenderTarget::new(
                device,
                "scene_depth",
                size,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            size,
        })
    }
}

/// Triangle-strip quad shared by every screen-space pass.
pub struct FullscreenQuad {
    vertex_buffer: wgpu::Buffer,
}

impl FullscreenQuad {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen_quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { vertex_buffer }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

/// Anything the geometry, marker or skybox passes can draw.
pub trait SceneGeometry {
    /// Bind buffers and issue the draw for `instances`.
    fn draw_instanced(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>);

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_instanced(pass, 0..1);
    }
}

/// Indexed triangle mesh on the GPU
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn from_mesh(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

impl SceneGeometry for GpuMesh {
    fn draw_instanced(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// A mesh with its own model transform uniform.
pub struct SceneObject {
    pub name: &'static str,
    pub mesh: GpuMesh,
    pub base_transform: glam::Mat4,
    /// Spins with the frame clock around +Y
    pub animated: bool,
    pub model_buffer: wgpu::Buffer,
    pub model_bind_group: wgpu::BindGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_format_is_not_blendable_by_default() {
        let features = POSITION_FORMAT.guaranteed_format_features(wgpu::Features::empty());
        assert_eq!(attachment_problem(&features, true), Some("not blendable"));
        assert_eq!(attachment_problem(&features, false), None);
    }

    #[test]
    fn test_guaranteed_formats_cover_every_target() {
        for format in [POSITION_FORMAT, NORMAL_FORMAT, ALBEDO_FORMAT, DEPTH_FORMAT, OCCLUSION_FORMAT, OUTPUT_FORMAT] {
            let features = format.guaranteed_format_features(wgpu::Features::empty());
            let blended = TARGET_BLEND.is_some() && !format.is_depth_stencil_format();
            assert_eq!(attachment_problem(&features, blended), None, "{format:?}");
        }
    }

    #[test]
    fn test_sample_only_format_is_refused() {
        let features = wgpu::TextureFormat::Rgb9e5Ufloat.guaranteed_format_features(wgpu::Features::empty());
        assert_eq!(attachment_problem(&features, false), Some("not renderable and sampleable"));
    }
}
