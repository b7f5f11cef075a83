//! GLEngine viewer - interactive window running the GPU passes

mod app;
mod camera;
mod input;
mod overlay;
mod renderer;
mod viewport;

pub use camera::FlyCamera;
pub use input::{Action, InputSnapshot, KeyBindings};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::pipeline::{PipelineConfig, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// What the viewer starts with.
#[derive(Debug, Clone, Default)]
pub struct ViewerOptions {
    pub config: PipelineConfig,
    /// Directory holding the six cubemap faces; procedural sky when `None`
    pub cubemap: Option<PathBuf>,
}

/// Open the window and run until it is closed. Logging must already be set up.
pub fn run(options: ViewerOptions) -> Result<()> {
    // Friendly panic handler for GPU errors
    std::panic::set_hook(Box::new(|info| {
        let msg = info
            .payload()
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("Unknown error");

        if msg.contains("wgpu") || msg.contains("Buffer") || msg.contains("shader") {
            eprintln!("\n[GPU Error] {}", msg);
            eprintln!("\nThis is likely a shader/buffer mismatch. Try updating or rebuilding.");
        } else {
            eprintln!("\n[Error] {}", msg);
            if let Some(loc) = info.location() {
                eprintln!("  at {}:{}:{}", loc.file(), loc.line(), loc.column());
            }
        }
    }));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([VIEWPORT_WIDTH as f32, VIEWPORT_HEIGHT as f32])
            .with_resizable(false)
            .with_title("GLEngine"),
        renderer: eframe::Renderer::Wgpu,
        wgpu_options: egui_wgpu::WgpuConfiguration {
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                device_descriptor: Arc::new(|adapter| {
                    let base_limits = if adapter.get_info().backend == wgpu::Backend::Gl {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    };
                    // Both are optional; the renderer checks what it got
                    let wanted = wgpu::Features::TIMESTAMP_QUERY | wgpu::Features::POLYGON_MODE_LINE;
                    wgpu::DeviceDescriptor {
                        label: Some("glengine device"),
                        required_features: wanted & adapter.features(),
                        required_limits: base_limits,
                        ..Default::default()
                    }
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    tracing::info!("starting viewer");
    let ViewerOptions { config, cubemap } = options;
    eframe::run_native(
        "GLEngine",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::GlEngineApp::new(cc, config, cubemap)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run: {}", e))
}
