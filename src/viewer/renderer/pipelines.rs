//! Bind group layouts and render pipelines for every pass.

use deferred_surface::{
    marker_instance_layout, quad_vertex_layout, vertex_buffer_layout, DEPTH_BLIT_SHADER, GBUFFER_SHADER,
    LIGHTING_SHADER, MARKER_SHADER, SKYBOX_SHADER, SSAO_BLUR_SHADER, SSAO_SHADER,
};

use super::resources::{
    ALBEDO_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT, OCCLUSION_FORMAT, OUTPUT_FORMAT, POSITION_FORMAT, TARGET_BLEND,
};

pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub model: wgpu::BindGroupLayout,
    pub ssao: wgpu::BindGroupLayout,
    pub blur: wgpu::BindGroupLayout,
    pub lighting: wgpu::BindGroupLayout,
    pub depth_blit: wgpu::BindGroupLayout,
    pub environment: wgpu::BindGroupLayout,
}

pub struct Pipelines {
    pub gbuffer_fill: wgpu::RenderPipeline,
    /// None when the adapter lacks `POLYGON_MODE_LINE`
    pub gbuffer_wireframe: Option<wgpu::RenderPipeline>,
    pub ssao: wgpu::RenderPipeline,
    pub blur: wgpu::RenderPipeline,
    pub lighting: wgpu::RenderPipeline,
    pub depth_blit: wgpu::RenderPipeline,
    pub marker: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type,
        },
        count: None,
    }
}

/// G-Buffer and occlusion textures are read unfiltered.
fn unfiltered_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: false },
        wgpu::TextureViewDimension::D2,
    )
}

fn cube_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: true },
        wgpu::TextureViewDimension::Cube,
    )
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

fn layout(device: &wgpu::Device, label: &str, entries: &[wgpu::BindGroupLayoutEntry]) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries,
    })
}

pub fn create_layouts(device: &wgpu::Device) -> Layouts {
    let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
    Layouts {
        camera: layout(device, "camera_layout", &[uniform_entry(0, vertex_fragment)]),
        model: layout(device, "model_layout", &[uniform_entry(0, vertex_fragment)]),
        ssao: layout(
            device,
            "ssao_layout",
            &[
                unfiltered_entry(0),
                unfiltered_entry(1),
                unfiltered_entry(2),
                sampler_entry(3, wgpu::SamplerBindingType::NonFiltering),
                sampler_entry(4, wgpu::SamplerBindingType::NonFiltering),
                uniform_entry(5, wgpu::ShaderStages::FRAGMENT),
                uniform_entry(6, wgpu::ShaderStages::FRAGMENT),
            ],
        ),
        blur: layout(
            device,
            "ssao_blur_layout",
            &[unfiltered_entry(0), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
        ),
        lighting: layout(
            device,
            "lighting_layout",
            &[
                unfiltered_entry(0),
                unfiltered_entry(1),
                unfiltered_entry(2),
                unfiltered_entry(3),
                cube_entry(4),
                sampler_entry(5, wgpu::SamplerBindingType::Filtering),
                uniform_entry(6, wgpu::ShaderStages::FRAGMENT),
            ],
        ),
        depth_blit: layout(
            device,
            "depth_blit_layout",
            &[texture_entry(0, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2)],
        ),
        environment: layout(
            device,
            "environment_layout",
            &[cube_entry(0), sampler_entry(1, wgpu::SamplerBindingType::Filtering)],
        ),
    }
}

fn shader(device: &wgpu::Device, label: &str, source: &'static str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

fn pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

fn color_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: TARGET_BLEND,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

fn depth_state(compare: wgpu::CompareFunction, write: bool) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

/// Quad vertex stage plus one fragment entry point writing `format`.
fn screen_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fs_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            buffers: &[quad_vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[color_target(format)],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn gbuffer_pipeline(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    let label = match polygon_mode {
        wgpu::PolygonMode::Line => "gbuffer_wireframe_pipeline",
        _ => "gbuffer_pipeline",
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_gbuffer"),
            compilation_options: Default::default(),
            buffers: &[vertex_buffer_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_gbuffer"),
            compilation_options: Default::default(),
            targets: &[
                color_target(POSITION_FORMAT),
                color_target(NORMAL_FORMAT),
                color_target(ALBEDO_FORMAT),
            ],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            polygon_mode,
            ..Default::default()
        },
        depth_stencil: depth_state(wgpu::CompareFunction::Less, true),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub fn create_pipelines(device: &wgpu::Device, layouts: &Layouts, wireframe_supported: bool) -> Pipelines {
    let gbuffer_shader = shader(device, "gbuffer_shader", GBUFFER_SHADER);
    let gbuffer_layout = pipeline_layout(device, "gbuffer_pipeline_layout", &[&layouts.camera, &layouts.model]);
    let gbuffer_fill = gbuffer_pipeline(device, &gbuffer_shader, &gbuffer_layout, wgpu::PolygonMode::Fill);
    let gbuffer_wireframe = wireframe_supported
        .then(|| gbuffer_pipeline(device, &gbuffer_shader, &gbuffer_layout, wgpu::PolygonMode::Line));

    let ssao_shader = shader(device, "ssao_shader", SSAO_SHADER);
    let ssao = screen_pipeline(
        device,
        "ssao_pipeline",
        &ssao_shader,
        &pipeline_layout(device, "ssao_pipeline_layout", &[&layouts.ssao]),
        "fs_ssao",
        OCCLUSION_FORMAT,
    );

    let blur_shader = shader(device, "ssao_blur_shader", SSAO_BLUR_SHADER);
    let blur = screen_pipeline(
        device,
        "ssao_blur_pipeline",
        &blur_shader,
        &pipeline_layout(device, "ssao_blur_pipeline_layout", &[&layouts.blur]),
        "fs_blur",
        OCCLUSION_FORMAT,
    );

    let lighting_shader = shader(device, "lighting_shader", LIGHTING_SHADER);
    let lighting = screen_pipeline(
        device,
        "lighting_pipeline",
        &lighting_shader,
        &pipeline_layout(device, "lighting_pipeline_layout", &[&layouts.lighting]),
        "fs_lighting",
        OUTPUT_FORMAT,
    );

    // Depth only: no color targets, every fragment overwrites
    let depth_blit_shader = shader(device, "depth_blit_shader", DEPTH_BLIT_SHADER);
    let depth_blit_layout = pipeline_layout(device, "depth_blit_pipeline_layout", &[&layouts.depth_blit]);
    let depth_blit = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("depth_blit_pipeline"),
        layout: Some(&depth_blit_layout),
        vertex: wgpu::VertexState {
            module: &depth_blit_shader,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            buffers: &[quad_vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &depth_blit_shader,
            entry_point: Some("fs_depth_blit"),
            compilation_options: Default::default(),
            targets: &[],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: depth_state(wgpu::CompareFunction::Always, true),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let marker_shader = shader(device, "marker_shader", MARKER_SHADER);
    let marker_layout = pipeline_layout(device, "marker_pipeline_layout", &[&layouts.camera]);
    let marker = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("marker_pipeline"),
        layout: Some(&marker_layout),
        vertex: wgpu::VertexState {
            module: &marker_shader,
            entry_point: Some("vs_marker"),
            compilation_options: Default::default(),
            buffers: &[vertex_buffer_layout(), marker_instance_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &marker_shader,
            entry_point: Some("fs_marker"),
            compilation_options: Default::default(),
            targets: &[color_target(OUTPUT_FORMAT)],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: depth_state(wgpu::CompareFunction::Less, true),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    // Sky sits at depth 1.0 and only fills pixels nothing else wrote
    let skybox_shader = shader(device, "skybox_shader", SKYBOX_SHADER);
    let skybox_layout = pipeline_layout(
        device,
        "skybox_pipeline_layout",
        &[&layouts.camera, &layouts.environment],
    );
    let skybox = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("skybox_pipeline"),
        layout: Some(&skybox_layout),
        vertex: wgpu::VertexState {
            module: &skybox_shader,
            entry_point: Some("vs_skybox"),
            compilation_options: Default::default(),
            buffers: &[vertex_buffer_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &skybox_shader,
            entry_point: Some("fs_skybox"),
            compilation_options: Default::default(),
            targets: &[color_target(OUTPUT_FORMAT)],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: depth_state(wgpu::CompareFunction::LessEqual, false),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Pipelines {
        gbuffer_fill,
        gbuffer_wireframe,
        ssao,
        blur,
        lighting,
        depth_blit,
        marker,
        skybox,
    }
}
