//! Debug overlay: parameter editing, pass timings and adapter info.

use egui::{Color32, RichText};
use glam::{Vec3, Vec4};

use crate::pipeline::config::{MAX_SSAO_POWER, MAX_SSAO_RADIUS};
use crate::pipeline::kernel::{MAX_KERNEL_SIZE, MAX_NOISE_SIZE};
use crate::pipeline::blur::MAX_BLUR_SIZE;
use crate::pipeline::{DebugView, FrameTimings, PipelineConfig};

/// Adapter details shown under "Application Info".
#[derive(Debug, Clone, Default)]
pub struct AdapterSummary {
    pub name: String,
    pub backend: String,
    pub driver: String,
    pub timestamps: bool,
}

impl AdapterSummary {
    pub fn from_info(info: &wgpu::AdapterInfo, timestamps: bool) -> Self {
        let driver = if info.driver_info.is_empty() {
            info.driver.clone()
        } else {
            format!("{} ({})", info.driver, info.driver_info)
        };
        Self {
            name: info.name.clone(),
            backend: format!("{:?}", info.backend),
            driver,
            timestamps,
        }
    }
}

/// Read-only values the overlay displays.
pub struct OverlayStats<'a> {
    pub adapter: &'a AdapterSummary,
    pub timings: &'a FrameTimings,
    pub fps: f32,
    pub frame_ms: f32,
    pub error: Option<&'a str>,
}

/// Format FPS for display (hide decimals for whole numbers)
fn format_fps(fps: f32) -> String {
    if (fps - fps.round()).abs() < 0.001 {
        format!("{:.0}", fps)
    } else {
        format!("{:.1}", fps)
    }
}

/// Draw the overlay window. Returns true when any parameter changed.
pub fn show(ctx: &egui::Context, config: &mut PipelineConfig, stats: &OverlayStats<'_>) -> bool {
    let _span = tracing::info_span!("overlay").entered();
    let mut changed = false;

    egui::Window::new("GLEngine")
        .default_pos([12.0, 12.0])
        .default_width(300.0)
        .resizable(false)
        .show(ctx, |ui| {
            if let Some(error) = stats.error {
                ui.label(RichText::new(error).color(Color32::LIGHT_RED));
                ui.separator();
            }

            egui::CollapsingHeader::new("Rendering options")
                .default_open(true)
                .show(ui, |ui| {
                    changed |= rendering_options(ui, config);
                });

            egui::CollapsingHeader::new("Profiling")
                .default_open(true)
                .show(ui, |ui| profiling(ui, stats.timings));

            egui::CollapsingHeader::new("Application Info")
                .default_open(false)
                .show(ui, |ui| {
                    egui::Grid::new("app_info").num_columns(2).show(ui, |ui| {
                        ui.label("Adapter:");
                        ui.label(&stats.adapter.name);
                        ui.end_row();
                        ui.label("Backend:");
                        ui.label(&stats.adapter.backend);
                        ui.end_row();
                        ui.label("Driver:");
                        ui.label(&stats.adapter.driver);
                        ui.end_row();
                        ui.label("FPS:");
                        ui.label(format!("{} ({:.2} ms)", format_fps(stats.fps), stats.frame_ms));
                        ui.end_row();
                    });
                });

            egui::CollapsingHeader::new("About")
                .default_open(false)
                .show(ui, |ui| {
                    ui.label(format!("glengine {}", env!("CARGO_PKG_VERSION")));
                    ui.label(format!(
                        "Built {} {}",
                        env!("GLENGINE_BUILD_DATE"),
                        env!("GLENGINE_BUILD_TIME")
                    ));
                    ui.label("1-5 debug view, F11 fill, F12 wireframe, Esc quit");
                    ui.label("Hold right mouse: look, WASD move, scroll zoom");
                });
        });

    changed
}

fn rendering_options(ui: &mut egui::Ui, config: &mut PipelineConfig) -> bool {
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.label("View:");
        egui::ComboBox::from_id_salt("debug_view")
            .selected_text(config.debug_view.label())
            .show_ui(ui, |ui| {
                for view in DebugView::ALL {
                    let text = format!("{} {}", view.index(), view.label());
                    changed |= ui.selectable_value(&mut config.debug_view, view, text).changed();
                }
            });
    });
    changed |= ui.checkbox(&mut config.wireframe, "Wireframe").changed();

    ui.separator();
    ui.label(RichText::new("Material").strong());
    let material = &mut config.material;
    let mut albedo = material.albedo().to_array();
    ui.horizontal(|ui| {
        ui.label("Albedo:");
        if ui.color_edit_button_rgb(&mut albedo).changed() {
            material.set_albedo(Vec3::from_array(albedo));
            changed = true;
        }
    });
    changed |= slider(ui, "Roughness", material.roughness(), 0.0..=1.0, |v| material.set_roughness(v));
    changed |= slider(ui, "Metallicity", material.metallicity(), 0.0..=1.0, |v| material.set_metallicity(v));
    changed |= slider(ui, "F0", material.f0(), 0.0..=1.0, |v| material.set_f0(v));

    ui.separator();
    ui.label(RichText::new("Lighting").strong());
    changed |= slider(ui, "Light intensity", config.light_intensity(), 0.0..=20.0, |v| config.set_light_intensity(v));
    changed |= slider(ui, "Ambient", config.ambient_intensity(), 0.0..=1.0, |v| config.set_ambient_intensity(v));
    changed |= slider(ui, "Env. specular", config.environment_specular(), 0.0..=1.0, |v| {
        config.set_environment_specular(v)
    });
    for (i, light) in config.lights.iter_mut().enumerate() {
        let mut color = light.color().to_array();
        ui.horizontal(|ui| {
            ui.label(format!("Light {}:", i + 1));
            if ui.color_edit_button_rgba_unmultiplied(&mut color).changed() {
                light.set_color(Vec4::from_array(color));
                changed = true;
            }
            let p = light.position;
            ui.label(RichText::new(format!("({:.2}, {:.2}, {:.2})", p.x, p.y, p.z)).weak());
        });
    }

    ui.separator();
    ui.label(RichText::new("SSAO").strong());
    let ssao = &mut config.ssao;
    changed |= slider_u32(ui, "Kernel size", ssao.kernel_size(), MAX_KERNEL_SIZE as u32, |v| ssao.set_kernel_size(v));
    changed |= slider_u32(ui, "Noise size", ssao.noise_size(), MAX_NOISE_SIZE, |v| ssao.set_noise_size(v));
    changed |= slider(ui, "Radius", ssao.radius(), 0.0..=MAX_SSAO_RADIUS, |v| ssao.set_radius(v));
    changed |= slider(ui, "Power", ssao.power(), 0.0..=MAX_SSAO_POWER, |v| ssao.set_power(v));
    changed |= slider_u32(ui, "Blur size", ssao.blur_size(), MAX_BLUR_SIZE, |v| ssao.set_blur_size(v));
    changed |= slider(ui, "Visibility", ssao.visibility(), 0.0..=1.0, |v| ssao.set_visibility(v));

    changed
}

fn slider(
    ui: &mut egui::Ui,
    label: &str,
    value: f32,
    range: std::ops::RangeInclusive<f32>,
    set: impl FnOnce(f32),
) -> bool {
    let mut v = value;
    let changed = ui.add(egui::Slider::new(&mut v, range).text(label)).changed();
    if changed {
        set(v);
    }
    changed
}

fn slider_u32(ui: &mut egui::Ui, label: &str, value: u32, max: u32, set: impl FnOnce(u32)) -> bool {
    let mut v = value;
    let changed = ui.add(egui::Slider::new(&mut v, 0..=max).text(label)).changed();
    if changed {
        set(v);
    }
    changed
}

fn profiling(ui: &mut egui::Ui, timings: &FrameTimings) {
    egui::Grid::new("pass_timings").num_columns(2).striped(true).show(ui, |ui| {
        for (pass, millis) in timings.iter() {
            ui.label(pass.label());
            match millis {
                Some(ms) => ui.monospace(format!("{ms:.3} ms")),
                None => ui.label(RichText::new("unavailable").weak()),
            };
            ui.end_row();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_format() {
        assert_eq!(format_fps(60.0), "60");
        assert_eq!(format_fps(59.94), "59.9");
    }
}
