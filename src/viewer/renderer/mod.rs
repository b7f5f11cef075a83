//! wgpu deferred renderer
//!
//! Owns every GPU resource of the pipeline. One call to
//! [`DeferredRenderer::render`] records the geometry, occlusion, blur,
//! lighting, forward and cubemap passes in that order, each step checked
//! against the [`FrameScheduler`] before it is encoded.

use std::cell::OnceCell;
use std::sync::Arc;

use glam::{Mat4, UVec4, Vec3, Vec4};
use wgpu::util::DeviceExt;

mod environment;
mod passes;
mod pipelines;
mod resources;
mod timing;

use environment::{EnvironmentTexture, PROCEDURAL_FACE_SIZE};
use pipelines::{create_layouts, create_pipelines, Pipelines};
use resources::{FullscreenQuad, GBufferTargets, GpuMesh, OcclusionTargets, OutputTargets, SceneObject};
use timing::GpuTimer;

use deferred_surface::{
    shapes, BlurUniform, CameraUniform, KernelUniform, LightUniform, LightingUniform, MarkerInstance,
    ModelUniform, SsaoUniform, LIGHT_COUNT,
};

use crate::pipeline::config::MARKER_SCALE;
use crate::pipeline::environment::{CubemapFaces, ProceduralSky};
use crate::pipeline::kernel::generate_occlusion_inputs;
use crate::pipeline::occlusion::OCCLUSION_BIAS;
use crate::pipeline::timing::read_timings;
use crate::pipeline::{FrameScheduler, FrameStep, FrameTimings, PassKind, PipelineConfig, TimingPolicy};
use crate::{Error, Result};

/// Per-frame values the app hands to the renderer.
pub struct FrameInputs<'a> {
    pub config: &'a PipelineConfig,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    /// Rotation of the animated model about +Y, radians
    pub model_angle: f32,
}

/// GPU side of the pipeline.
pub struct DeferredRenderer {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pipelines: Pipelines,
    quad: OnceCell<FullscreenQuad>,

    // Targets
    gbuffer: GBufferTargets,
    occlusion: OcclusionTargets,
    output: OutputTargets,

    // Uniforms
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    ssao_params_buffer: wgpu::Buffer,
    _kernel_buffer: wgpu::Buffer,
    _noise_texture: wgpu::Texture,
    blur_params_buffer: wgpu::Buffer,
    lighting_params_buffer: wgpu::Buffer,

    // Bind groups over the targets, built once since the viewport never resizes
    ssao_bind_group: wgpu::BindGroup,
    blur_bind_group: wgpu::BindGroup,
    /// Built once the blurred occlusion target has been rendered
    lighting_bind_group: OnceCell<wgpu::BindGroup>,
    lighting_layout: wgpu::BindGroupLayout,
    depth_blit_bind_group: wgpu::BindGroup,

    environment: EnvironmentTexture,

    // Geometry
    objects: Vec<SceneObject>,
    marker_mesh: GpuMesh,
    marker_instances: wgpu::Buffer,
    sky_mesh: GpuMesh,

    scheduler: FrameScheduler,
    timer: Option<GpuTimer>,
    timings: FrameTimings,
}

impl DeferredRenderer {
    /// Build targets, pipelines and the demo scene.
    ///
    /// Fails with `FramebufferIncomplete` when the device cannot render to
    /// one of the target formats or rejects any setup call. Validation errors
    /// are caught in an error scope instead of reaching the uncaptured handler.
    pub fn new(
        adapter: &wgpu::Adapter,
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        size: (u32, u32),
        config: &PipelineConfig,
        cubemap: Option<CubemapFaces>,
    ) -> Result<Self> {
        let _span = tracing::info_span!("renderer_setup").entered();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = Self::build(adapter, Arc::clone(&device), queue, size, config, cubemap);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!("renderer setup rejected by the device: {err}");
            return Err(Error::incomplete(err.to_string()));
        }
        built
    }

    fn build(
        adapter: &wgpu::Adapter,
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        size: (u32, u32),
        config: &PipelineConfig,
        cubemap: Option<CubemapFaces>,
    ) -> Result<Self> {

        let gbuffer = GBufferTargets::new(adapter, &device, size)?;
        let occlusion = OcclusionTargets::new(adapter, &device, size)?;
        let output = OutputTargets::new(adapter, &device, size)?;

        let wireframe_supported = device.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        if !wireframe_supported {
            tracing::info!("POLYGON_MODE_LINE unsupported, wireframe mode disabled");
        }
        let layouts = create_layouts(&device);
        let pipelines = create_pipelines(&device, &layouts, wireframe_supported);

        // Camera
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&CameraUniform::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Kernel goes up once; per frame only the scalar parameters change
        let (kernel, noise) = generate_occlusion_inputs(config.seed)?;
        let kernel_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ssao_kernel"),
            contents: bytemuck::bytes_of(&KernelUniform::from_samples(kernel.samples())),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let noise_data = noise.to_rgba_f16();
        let noise_dim = crate::pipeline::kernel::NOISE_TILE_DIM as u32;
        let noise_texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("ssao_noise"),
                size: wgpu::Extent3d {
                    width: noise_dim,
                    height: noise_dim,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&noise_data),
        );
        let noise_view = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let clamp_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ssao_clamp_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let wrap_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ssao_wrap_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let ssao_params_buffer = uniform_buffer(&device, "ssao_params", std::mem::size_of::<SsaoUniform>());
        let blur_params_buffer = uniform_buffer(&device, "ssao_blur_params", std::mem::size_of::<BlurUniform>());
        let lighting_params_buffer =
            uniform_buffer(&device, "lighting_params", std::mem::size_of::<LightingUniform>());

        let ssao_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ssao_bind_group"),
            layout: &layouts.ssao,
            entries: &[
                texture_binding(0, &gbuffer.position.view),
                texture_binding(1, &gbuffer.normal.view),
                texture_binding(2, &noise_view),
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&clamp_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&wrap_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: ssao_params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: kernel_buffer.as_entire_binding(),
                },
            ],
        });

        let blur_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ssao_blur_bind_group"),
            layout: &layouts.blur,
            entries: &[
                texture_binding(0, &occlusion.raw.view),
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: blur_params_buffer.as_entire_binding(),
                },
            ],
        });

        let environment = {
            let faces = match cubemap {
                Some(faces) => faces,
                None => CubemapFaces::from_environment(&ProceduralSky::default(), PROCEDURAL_FACE_SIZE),
            };
            EnvironmentTexture::new(&device, &queue, &layouts.environment, &faces)
        };

        let depth_blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("depth_blit_bind_group"),
            layout: &layouts.depth_blit,
            entries: &[texture_binding(0, &gbuffer.depth.view)],
        });

        // Scene: a spinning torus over a ground plane
        let mut objects = Vec::new();
        objects.push(scene_object(
            &device,
            &layouts.model,
            "ground",
            &shapes::plane(3.0),
            Mat4::IDENTITY,
            false,
        ));
        objects.push(scene_object(
            &device,
            &layouts.model,
            "model",
            &shapes::torus(0.6, 0.25, 48, 24),
            Mat4::from_translation(Vec3::new(0.0, 0.6, 0.0)),
            true,
        ));

        let marker_mesh = GpuMesh::from_mesh(&device, "marker", &shapes::cube(0.5));
        let marker_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker_instances"),
            size: (std::mem::size_of::<MarkerInstance>() * LIGHT_COUNT) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sky_mesh = GpuMesh::from_mesh(&device, "sky", &shapes::cube(1.0));

        let timer = GpuTimer::new(Arc::clone(&device), &queue);

        tracing::info!(
            width = size.0,
            height = size.1,
            timestamps = timer.is_some(),
            wireframe = wireframe_supported,
            "deferred renderer ready"
        );

        Ok(Self {
            device,
            queue,
            pipelines,
            quad: OnceCell::new(),
            gbuffer,
            occlusion,
            output,
            camera_buffer,
            camera_bind_group,
            ssao_params_buffer,
            _kernel_buffer: kernel_buffer,
            _noise_texture: noise_texture,
            blur_params_buffer,
            lighting_params_buffer,
            ssao_bind_group,
            blur_bind_group,
            lighting_bind_group: OnceCell::new(),
            lighting_layout: layouts.lighting,
            depth_blit_bind_group,
            environment,
            objects,
            marker_mesh,
            marker_instances,
            sky_mesh,
            scheduler: FrameScheduler::new(),
            timer,
            timings: FrameTimings::unavailable(),
        })
    }

    /// View of the presented color texture, for registration with egui.
    pub fn output_view(&self) -> &wgpu::TextureView {
        &self.output.color.view
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output.size
    }

    /// Whether GPU pass timings can ever be available.
    pub fn has_timestamps(&self) -> bool {
        self.timer.is_some()
    }

    /// Shared full-screen quad, created on first use.
    fn quad(&self) -> &FullscreenQuad {
        self.quad.get_or_init(|| FullscreenQuad::new(&self.device))
    }

    /// G-Buffer, blurred occlusion and environment as read by the lighting pass.
    fn create_lighting_bind_group(&self) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting_bind_group"),
            layout: &self.lighting_layout,
            entries: &[
                texture_binding(0, &self.gbuffer.position.view),
                texture_binding(1, &self.gbuffer.normal.view),
                texture_binding(2, &self.gbuffer.albedo.view),
                texture_binding(3, &self.occlusion.blurred.view),
                texture_binding(4, &self.environment.view),
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&self.environment.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: self.lighting_params_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn write_uniforms(&self, frame: &FrameInputs<'_>) {
        let config = frame.config;
        let (width, height) = self.gbuffer.size;

        let camera = CameraUniform::new(frame.view, frame.projection, frame.camera_position);
        self.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));

        let albedo = config.material.albedo();
        for object in &self.objects {
            let model = if object.animated {
                Mat4::from_rotation_y(frame.model_angle) * object.base_transform
            } else {
                object.base_transform
            };
            let uniform = ModelUniform::new(model, albedo);
            self.queue.write_buffer(&object.model_buffer, 0, bytemuck::bytes_of(&uniform));
        }

        let ssao = &config.ssao;
        let ssao_uniform = SsaoUniform {
            view: frame.view,
            projection: frame.projection,
            shape: Vec4::new(ssao.radius(), ssao.power(), OCCLUSION_BIAS, 0.0),
            counts: UVec4::new(ssao.kernel_size(), ssao.noise_size(), ssao.blur_size(), 0),
            viewport: Vec4::new(width as f32, height as f32, 1.0 / width as f32, 1.0 / height as f32),
        };
        self.queue.write_buffer(&self.ssao_params_buffer, 0, bytemuck::bytes_of(&ssao_uniform));

        let blur = BlurUniform {
            size: UVec4::new(ssao.blur_size(), 0, 0, 0),
        };
        self.queue.write_buffer(&self.blur_params_buffer, 0, bytemuck::bytes_of(&blur));

        let material = &config.material;
        let lighting = LightingUniform {
            view_position: frame.camera_position.extend(1.0),
            material: Vec4::new(material.roughness(), material.metallicity(), material.f0(), ssao.visibility()),
            shading: Vec4::new(
                config.ambient_intensity(),
                config.environment_specular(),
                config.light_intensity(),
                0.0,
            ),
            mode: UVec4::new(config.debug_view.index(), 0, 0, 0),
            lights: config.lights.map(|light| LightUniform {
                position: light.position.extend(1.0),
                color: light.color(),
            }),
        };
        self.queue.write_buffer(&self.lighting_params_buffer, 0, bytemuck::bytes_of(&lighting));

        let markers = config.lights.map(|light| MarkerInstance::new(light.position, MARKER_SCALE, light.color()));
        self.queue.write_buffer(&self.marker_instances, 0, bytemuck::cast_slice(&markers));
    }

    /// Record and submit one frame into the output texture.
    ///
    /// An error leaves the previous frame's contents in place; nothing from
    /// the failed frame is submitted.
    pub fn render(&mut self, frame: &FrameInputs<'_>) -> Result<()> {
        let _span = tracing::info_span!("render_frame").entered();

        self.write_uniforms(frame);
        self.scheduler.begin_frame();

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        self.scheduler.record(FrameStep::GeometryFill)?;
        self.render_geometry_pass(&mut encoder, frame.config.wireframe);

        self.scheduler.record(FrameStep::OcclusionEstimate)?;
        self.render_occlusion_pass(&mut encoder);

        self.scheduler.record(FrameStep::OcclusionBlur)?;
        self.render_blur_pass(&mut encoder);

        self.scheduler.record(FrameStep::Lighting)?;
        self.render_lighting_pass(&mut encoder)?;

        self.scheduler.record(FrameStep::DepthCopy)?;
        self.render_depth_copy(&mut encoder);

        self.scheduler.record(FrameStep::MarkerDraw)?;
        self.render_markers(&mut encoder);

        self.scheduler.record(FrameStep::CubemapDraw)?;
        self.render_cubemap(&mut encoder);

        if let Some(timer) = &self.timer {
            timer.resolve(&mut encoder);
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(timer) = &mut self.timer {
            timer.request_readback();
        }
        Ok(())
    }

    /// Mark the GUI step done and store its CPU-measured duration.
    pub fn record_gui(&mut self, millis: f32) -> Result<()> {
        self.scheduler.record(FrameStep::GuiDraw)?;
        self.timings.set(PassKind::Gui, Some(millis));
        Ok(())
    }

    /// Poll the timestamp readback under `policy`. GPU timings of a frame
    /// whose readback did not arrive in time are reported unavailable.
    pub fn poll_timings(&mut self, policy: &TimingPolicy) -> FrameTimings {
        let gui = self.timings.get(PassKind::Gui);
        let mut timings = match &mut self.timer {
            Some(timer) if timer.in_flight() => read_timings(timer, policy),
            _ => FrameTimings::unavailable(),
        };
        timings.set(PassKind::Gui, gui);
        self.timings = timings;
        timings
    }

    pub fn timings(&self) -> &FrameTimings {
        &self.timings
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn texture_binding(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

fn scene_object(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    name: &'static str,
    mesh: &deferred_surface::MeshData,
    base_transform: Mat4,
    animated: bool,
) -> SceneObject {
    let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name}_model")),
        contents: bytemuck::bytes_of(&ModelUniform::new(base_transform, Vec3::ONE)),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{name}_model_bind_group")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: model_buffer.as_entire_binding(),
        }],
    });
    tracing::debug!(name, triangles = mesh.triangle_count(), "scene object created");
    SceneObject {
        name,
        mesh: GpuMesh::from_mesh(device, name, mesh),
        base_transform,
        animated,
        model_buffer,
        model_bind_group,
    }
}
