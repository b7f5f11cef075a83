//! 3D viewport widget for egui

use egui::{Sense, Ui};

use super::camera::FlyCamera;
use super::input::InputSnapshot;
use super::renderer::{DeferredRenderer, FrameInputs};
use crate::pipeline::environment::CubemapFaces;
use crate::pipeline::{PipelineConfig, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// Scroll points per degree of field of view
const ZOOM_STEP: f32 = 10.0;

/// Camera, renderer and the egui texture showing its output.
pub struct Viewport {
    pub camera: FlyCamera,
    pub renderer: Option<DeferredRenderer>,
    /// Set when renderer setup failed; shown by the overlay
    pub setup_error: Option<String>,
    texture_id: Option<egui::TextureId>,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            camera: FlyCamera::new(glam::Vec3::new(0.0, 1.6, 4.0), 0.0, -15.0),
            renderer: None,
            setup_error: None,
            texture_id: None,
        }
    }

    /// Create the renderer and register its output with egui. A failure is
    /// logged and kept for display; the app keeps running without a frame.
    pub fn init_renderer(
        &mut self,
        render_state: &egui_wgpu::RenderState,
        config: &PipelineConfig,
        cubemap: Option<CubemapFaces>,
    ) {
        let result = DeferredRenderer::new(
            &render_state.adapter,
            std::sync::Arc::new(render_state.device.clone()),
            std::sync::Arc::new(render_state.queue.clone()),
            (VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            config,
            cubemap,
        );
        match result {
            Ok(renderer) => {
                let tex_id = render_state.renderer.write().register_native_texture(
                    &render_state.device,
                    renderer.output_view(),
                    wgpu::FilterMode::Linear,
                );
                if let Some(old_id) = self.texture_id.replace(tex_id) {
                    render_state.renderer.write().free_texture(&old_id);
                }
                self.renderer = Some(renderer);
                self.setup_error = None;
            }
            Err(e) => {
                tracing::error!("renderer setup failed: {e}");
                self.setup_error = Some(e.to_string());
            }
        }
    }

    /// Apply camera-mode input: look, zoom and movement.
    pub fn handle_input(&mut self, input: &InputSnapshot) {
        if input.camera_mode {
            self.camera.look(input.look.x, input.look.y);
            self.camera.zoom(input.scroll / ZOOM_STEP);
            self.camera.fly(input.forward, input.right, input.dt);
        }
        self.camera.update(input.dt);
    }

    /// Render a frame and paint it over the whole panel. Returns false when
    /// no frame was submitted.
    pub fn show(&mut self, ui: &mut Ui, config: &PipelineConfig, model_angle: f32) -> bool {
        let _span = tracing::info_span!("viewport_show").entered();
        let size = ui.available_size();
        let (rect, _response) = ui.allocate_exact_size(size, Sense::hover());

        let (Some(renderer), Some(tex_id)) = (&mut self.renderer, self.texture_id) else {
            ui.painter().rect_filled(rect, 0.0, egui::Color32::from_rgb(30, 30, 35));
            let text = if self.setup_error.is_some() { "Renderer unavailable" } else { "Initializing..." };
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::default(),
                egui::Color32::GRAY,
            );
            return false;
        };

        let (width, height) = renderer.output_size();
        let frame = FrameInputs {
            config,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(width as f32 / height as f32),
            camera_position: self.camera.position(),
            model_angle,
        };
        // A failed frame keeps showing the previous contents
        let rendered = match renderer.render(&frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("frame skipped: {e}");
                false
            }
        };

        ui.painter().image(
            tex_id,
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
        rendered
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
