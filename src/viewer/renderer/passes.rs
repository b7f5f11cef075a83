//! Render passes of one frame, in recording order.

use deferred_surface::LIGHT_COUNT;

use super::resources::SceneGeometry;
use super::DeferredRenderer;
use crate::pipeline::PassKind;
use crate::{Error, Result};

fn clear_attachment(view: &wgpu::TextureView, color: wgpu::Color) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(color),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn load_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn depth_attachment(view: &wgpu::TextureView, load: wgpu::LoadOp<f32>) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

impl DeferredRenderer {
    fn timestamps(&self, pass: PassKind, begin: bool, end: bool) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        self.timer.as_ref().and_then(|timer| timer.writes(pass, begin, end))
    }

    /// Position, normal and albedo of every visible surface.
    pub(super) fn render_geometry_pass(&self, encoder: &mut wgpu::CommandEncoder, wireframe: bool) {
        let pipeline = match (&self.pipelines.gbuffer_wireframe, wireframe) {
            (Some(line), true) => line,
            _ => &self.pipelines.gbuffer_fill,
        };

        let gbuffer = &self.gbuffer;
        // Cleared position has w = 0, which later passes read as background
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gbuffer_pass"),
            color_attachments: &[
                clear_attachment(&gbuffer.position.view, wgpu::Color::TRANSPARENT),
                clear_attachment(&gbuffer.normal.view, wgpu::Color::TRANSPARENT),
                clear_attachment(&gbuffer.albedo.view, wgpu::Color::TRANSPARENT),
            ],
            depth_stencil_attachment: depth_attachment(&gbuffer.depth.view, wgpu::LoadOp::Clear(1.0)),
            timestamp_writes: self.timestamps(PassKind::Geometry, true, true),
            occlusion_query_set: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for object in &self.objects {
            pass.push_debug_group(object.name);
            pass.set_bind_group(1, &object.model_bind_group, &[]);
            object.mesh.draw(&mut pass);
            pass.pop_debug_group();
        }
    }

    /// Raw occlusion estimate. Opens the SSAO timing bracket.
    pub(super) fn render_occlusion_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ssao_pass"),
            color_attachments: &[clear_attachment(&self.occlusion.raw.view, wgpu::Color::WHITE)],
            depth_stencil_attachment: None,
            timestamp_writes: self.timestamps(PassKind::Ssao, true, false),
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.ssao);
        pass.set_bind_group(0, &self.ssao_bind_group, &[]);
        self.quad().draw(&mut pass);
    }

    /// Box blur of the raw estimate. Closes the SSAO timing bracket and makes
    /// the blurred target available to the lighting pass.
    pub(super) fn render_blur_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ssao_blur_pass"),
                color_attachments: &[clear_attachment(&self.occlusion.blurred.view, wgpu::Color::WHITE)],
                depth_stencil_attachment: None,
                timestamp_writes: self.timestamps(PassKind::Ssao, false, true),
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.blur);
            pass.set_bind_group(0, &self.blur_bind_group, &[]);
            self.quad().draw(&mut pass);
        }
        self.lighting_bind_group.get_or_init(|| self.create_lighting_bind_group());
    }

    /// Cook-Torrance over the G-Buffer into the output texture.
    pub(super) fn render_lighting_pass(&self, encoder: &mut wgpu::CommandEncoder) -> Result<()> {
        let bind_group = self.lighting_bind_group.get().ok_or(Error::MissingBinding {
            pass: "lighting",
            resource: "blurred occlusion",
        })?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lighting_pass"),
            color_attachments: &[clear_attachment(&self.output.color.view, wgpu::Color::TRANSPARENT)],
            depth_stencil_attachment: None,
            timestamp_writes: self.timestamps(PassKind::Lighting, true, true),
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.lighting);
        pass.set_bind_group(0, bind_group, &[]);
        self.quad().draw(&mut pass);
        Ok(())
    }

    /// G-Buffer depth into the scene depth buffer. Opens the forward bracket.
    pub(super) fn render_depth_copy(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("depth_copy_pass"),
            color_attachments: &[],
            depth_stencil_attachment: depth_attachment(&self.output.depth.view, wgpu::LoadOp::Clear(1.0)),
            timestamp_writes: self.timestamps(PassKind::Forward, true, false),
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.depth_blit);
        pass.set_bind_group(0, &self.depth_blit_bind_group, &[]);
        self.quad().draw(&mut pass);
    }

    /// One instanced cube per light. Closes the forward bracket.
    pub(super) fn render_markers(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("marker_pass"),
            color_attachments: &[load_attachment(&self.output.color.view)],
            depth_stencil_attachment: depth_attachment(&self.output.depth.view, wgpu::LoadOp::Load),
            timestamp_writes: self.timestamps(PassKind::Forward, false, true),
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.marker);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(1, self.marker_instances.slice(..));
        self.marker_mesh.draw_instanced(&mut pass, 0..LIGHT_COUNT as u32);
    }

    /// Environment cube on the far plane, behind everything already drawn.
    pub(super) fn render_cubemap(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cubemap_pass"),
            color_attachments: &[load_attachment(&self.output.color.view)],
            depth_stencil_attachment: depth_attachment(&self.output.depth.view, wgpu::LoadOp::Load),
            timestamp_writes: self.timestamps(PassKind::Cubemap, true, true),
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.skybox);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_bind_group(1, &self.environment.bind_group, &[]);
        self.sky_mesh.draw(&mut pass);
    }
}
