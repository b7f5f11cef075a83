//! Main viewer application

use std::path::PathBuf;
use std::time::Instant;

use egui::CentralPanel;

use super::input::{Action, InputSnapshot, KeyBindings};
use super::overlay::{self, AdapterSummary, OverlayStats};
use super::viewport::Viewport;
use crate::pipeline::environment::CubemapFaces;
use crate::pipeline::{FrameTimings, PipelineConfig};
use crate::util::lerp;

/// Smoothing factor for the displayed frame time
const FRAME_TIME_SMOOTHING: f32 = 0.1;

pub struct GlEngineApp {
    config: PipelineConfig,
    viewport: Viewport,
    bindings: KeyBindings,
    initialized: bool,
    /// Loaded at startup, handed to the renderer on first frame
    pending_cubemap: Option<CubemapFaces>,
    /// Non-fatal startup problem shown in the overlay
    notice: Option<String>,
    adapter: AdapterSummary,
    timings: FrameTimings,
    start: Instant,
    frame_ms: f32,
}

impl GlEngineApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: PipelineConfig, cubemap: Option<PathBuf>) -> Self {
        let mut notice = None;
        let pending_cubemap = cubemap.and_then(|dir| match CubemapFaces::load(&dir) {
            Ok(faces) => {
                tracing::info!("loaded cubemap from {}", dir.display());
                Some(faces)
            }
            Err(e) => {
                tracing::warn!("cubemap not loaded, using procedural sky: {e}");
                notice = Some(format!("Cubemap not loaded: {e}"));
                None
            }
        });

        Self {
            config,
            viewport: Viewport::new(),
            bindings: KeyBindings::default(),
            initialized: false,
            pending_cubemap,
            notice,
            adapter: AdapterSummary::default(),
            timings: FrameTimings::unavailable(),
            start: Instant::now(),
            frame_ms: 0.0,
        }
    }

    fn initialize(&mut self, render_state: &egui_wgpu::RenderState) {
        let _span = tracing::info_span!("viewer_init").entered();
        self.viewport
            .init_renderer(render_state, &self.config, self.pending_cubemap.take());
        let timestamps = self
            .viewport
            .renderer
            .as_ref()
            .is_some_and(|r| r.has_timestamps());
        self.adapter = AdapterSummary::from_info(&render_state.adapter.get_info(), timestamps);
        tracing::info!(
            adapter = %self.adapter.name,
            backend = %self.adapter.backend,
            "viewer initialized"
        );
    }

    fn apply_actions(&mut self, ctx: &egui::Context, input: &InputSnapshot) {
        for action in &input.actions {
            match *action {
                Action::SelectView(index) => {
                    if self.config.set_debug_view_index(index) {
                        tracing::debug!("debug view {}", self.config.debug_view.label());
                    }
                }
                Action::FillMode => self.config.wireframe = false,
                Action::WireframeMode => self.config.wireframe = true,
                Action::Quit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            }
        }
    }

    fn fps(&self) -> f32 {
        if self.frame_ms > 0.0 {
            1000.0 / self.frame_ms
        } else {
            0.0
        }
    }
}

impl eframe::App for GlEngineApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let _span = tracing::info_span!("viewer_update").entered();

        if !self.initialized {
            if let Some(render_state) = frame.wgpu_render_state() {
                self.initialize(render_state);
            }
            self.initialized = true;
        }

        let input = InputSnapshot::capture(ctx, &self.bindings);
        self.apply_actions(ctx, &input);
        self.viewport.handle_input(&input);
        self.frame_ms = lerp(self.frame_ms, input.dt * 1000.0, FRAME_TIME_SMOOTHING);

        let model_angle = self.start.elapsed().as_secs_f32();
        let mut rendered = false;
        CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                rendered = self.viewport.show(ui, &self.config, model_angle);
            });

        if let Some(renderer) = &mut self.viewport.renderer {
            self.timings = renderer.poll_timings(&self.config.timing);
        }

        // GUI pass: timed on the CPU around overlay construction
        let gui_start = Instant::now();
        let error = self.viewport.setup_error.as_deref().or(self.notice.as_deref());
        let stats = OverlayStats {
            adapter: &self.adapter,
            timings: &self.timings,
            fps: self.fps(),
            frame_ms: self.frame_ms,
            error,
        };
        if overlay::show(ctx, &mut self.config, &stats) {
            tracing::trace!("pipeline parameters changed");
        }
        let gui_ms = gui_start.elapsed().as_secs_f32() * 1000.0;

        if rendered {
            if let Some(renderer) = &mut self.viewport.renderer {
                match renderer.record_gui(gui_ms) {
                    Ok(()) => self.timings = *renderer.timings(),
                    Err(e) => tracing::warn!("{e}"),
                }
            }
        }

        ctx.request_repaint();
    }
}
