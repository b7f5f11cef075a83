//! Deferred shading passes for wgpu
//!
//! WGSL sources, uniform layouts and vertex formats shared by the glengine
//! renderer. Every screen-space pass is assembled from the shared quad stage
//! plus its own fragment stage; geometry passes get the camera block prepended.
//!
//! ## Passes
//!
//! | Source | Entry points | Targets |
//! |---|---|---|
//! | [`GBUFFER_SHADER`] | `vs_gbuffer` / `fs_gbuffer` | position, normal, albedo, depth |
//! | [`SSAO_SHADER`] | `vs_quad` / `fs_ssao` | raw occlusion |
//! | [`SSAO_BLUR_SHADER`] | `vs_quad` / `fs_blur` | blurred occlusion |
//! | [`LIGHTING_SHADER`] | `vs_quad` / `fs_lighting` | presented color |
//! | [`DEPTH_BLIT_SHADER`] | `vs_quad` / `fs_depth_blit` | scene depth |
//! | [`MARKER_SHADER`] | `vs_marker` / `fs_marker` | presented color |
//! | [`SKYBOX_SHADER`] | `vs_skybox` / `fs_skybox` | presented color |

mod params;
pub mod shapes;

pub use params::{
    BlurUniform, CameraUniform, KernelUniform, LightUniform, LightingUniform, MarkerInstance,
    ModelUniform, SsaoUniform, LIGHT_COUNT, MAX_KERNEL_SIZE,
};
pub use shapes::MeshData;

/// Geometry pass writing the G-Buffer
pub const GBUFFER_SHADER: &str = concat!(
    include_str!("shaders/camera.wgsl"),
    include_str!("shaders/gbuffer.wgsl"),
);

/// Occlusion estimate
pub const SSAO_SHADER: &str = concat!(
    include_str!("shaders/quad.wgsl"),
    include_str!("shaders/ssao.wgsl"),
);

/// Box blur of the raw occlusion buffer
pub const SSAO_BLUR_SHADER: &str = concat!(
    include_str!("shaders/quad.wgsl"),
    include_str!("shaders/ssao_blur.wgsl"),
);

/// PBR compositing plus debug views
pub const LIGHTING_SHADER: &str = concat!(
    include_str!("shaders/quad.wgsl"),
    include_str!("shaders/lighting.wgsl"),
);

/// G-Buffer depth into the scene depth target
pub const DEPTH_BLIT_SHADER: &str = concat!(
    include_str!("shaders/quad.wgsl"),
    include_str!("shaders/depth_blit.wgsl"),
);

/// Light marker cubes
pub const MARKER_SHADER: &str = concat!(
    include_str!("shaders/camera.wgsl"),
    include_str!("shaders/marker.wgsl"),
);

/// Environment cube
pub const SKYBOX_SHADER: &str = concat!(
    include_str!("shaders/camera.wgsl"),
    include_str!("shaders/skybox.wgsl"),
);

/// Mesh vertex used by the geometry, marker and skybox pipelines
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}

/// Vertex buffer layout for [`Vertex`]
pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Full-screen quad vertex: clip-space position plus texture coordinate
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle-strip quad covering clip space. `uv` follows wgpu texture
/// convention, (0, 0) at the top-left.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
    QuadVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
];

/// Vertex buffer layout for [`QuadVertex`]
pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Per-instance layout for [`MarkerInstance`], locations 3..=7
pub fn marker_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(name: &str, source: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("{name} failed to parse:\n{}", e.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{name} failed validation: {e:?}"));
        module
    }

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|ep| ep.name.as_str()).collect()
    }

    #[test]
    fn test_all_shaders_validate() {
        let shaders = [
            ("gbuffer", GBUFFER_SHADER, &["vs_gbuffer", "fs_gbuffer"][..]),
            ("ssao", SSAO_SHADER, &["vs_quad", "fs_ssao"][..]),
            ("ssao_blur", SSAO_BLUR_SHADER, &["vs_quad", "fs_blur"][..]),
            ("lighting", LIGHTING_SHADER, &["vs_quad", "fs_lighting"][..]),
            ("depth_blit", DEPTH_BLIT_SHADER, &["vs_quad", "fs_depth_blit"][..]),
            ("marker", MARKER_SHADER, &["vs_marker", "fs_marker"][..]),
            ("skybox", SKYBOX_SHADER, &["vs_skybox", "fs_skybox"][..]),
        ];
        for (name, source, expected) in shaders {
            let module = validate(name, source);
            let found = entry_points(&module);
            for ep in expected {
                assert!(found.contains(ep), "{name} is missing entry point {ep}");
            }
        }
    }

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        // Sizes are fixed by the WGSL struct declarations
        assert_eq!(std::mem::size_of::<CameraUniform>(), 272);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 144);
        assert_eq!(std::mem::size_of::<SsaoUniform>(), 176);
        assert_eq!(std::mem::size_of::<KernelUniform>(), 1024);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 16);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 160);
        assert_eq!(std::mem::size_of::<MarkerInstance>(), 80);
    }

    #[test]
    fn test_quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[1]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
        // top-left of clip space maps to uv origin
        let top_left = QUAD_VERTICES.iter().find(|v| v.position[0] < 0.0 && v.position[1] > 0.0);
        assert_eq!(top_left.map(|v| v.uv), Some([0.0, 0.0]));
    }
}
