//! Pipeline configuration loading

use std::io::Write;

use glengine::pipeline::{DebugView, PipelineConfig};
use glengine::Error;
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(text.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config(r#"{ "debug_view": "Normal", "seed": 11 }"#);
    let config = PipelineConfig::load(file.path()).unwrap();
    let defaults = PipelineConfig::default();

    assert_eq!(config.debug_view, DebugView::Normal);
    assert_eq!(config.seed, Some(11));
    assert_eq!(config.material, defaults.material);
    assert_eq!(config.ssao, defaults.ssao);
    assert_eq!(config.lights, defaults.lights);
}

#[test]
fn out_of_range_values_are_clamped_on_load() {
    let file = write_config(
        r#"{
            "material": { "roughness": 3.0, "metallicity": -1.0, "f0": 0.5 },
            "ssao": { "kernel_size": 500, "visibility": 2.0, "blur_size": 99 },
            "timing": { "max_attempts": 0 }
        }"#,
    );
    let config = PipelineConfig::load(file.path()).unwrap();

    assert_eq!(config.material.roughness(), 1.0);
    assert_eq!(config.material.metallicity(), 0.0);
    assert_eq!(config.material.f0(), 0.5);
    assert_eq!(config.ssao.kernel_size(), 64);
    assert_eq!(config.ssao.visibility(), 1.0);
    assert_eq!(config.ssao.blur_size(), 16);
    assert_eq!(config.timing.max_attempts, 1);
}

#[test]
fn saved_config_loads_back() {
    let mut config = PipelineConfig::default();
    config.material.set_roughness(0.25);
    config.ssao.set_radius(2.0);
    config.seed = Some(3);
    let file = write_config(&config.to_json_string().unwrap());

    assert_eq!(PipelineConfig::load(file.path()).unwrap(), config);
}

#[test]
fn malformed_json_is_a_json_error() {
    let file = write_config("{ \"material\": ");
    assert!(matches!(PipelineConfig::load(file.path()), Err(Error::Json(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = PipelineConfig::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn light_with_only_position_keeps_default_color() {
    let file = write_config(r#"{ "lights": [{ "position": [0.0, 2.0, 0.0] }] }"#);
    let config = PipelineConfig::load(file.path()).unwrap();
    let defaults = PipelineConfig::default();

    assert_eq!(config.lights[0].position, glam::Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(config.lights[0].color(), defaults.lights[0].color());
    assert_eq!(config.lights[0].kind, defaults.lights[0].kind);
    assert_eq!(config.lights[1..], defaults.lights[1..]);
}
