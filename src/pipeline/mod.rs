//! Frame-composition pipeline, CPU side.
//!
//! Everything here runs without a GPU: parameter handling, kernel and noise
//! generation, pass ordering, timing policy, and a reference renderer that
//! mirrors the WGSL passes so the pipeline math can be checked in tests.
//!
//! - [`config`] - [`PipelineConfig`] and its clamped parameter groups
//! - [`kernel`] - SSAO sample kernel and rotation noise tile
//! - [`raster`] / [`gbuffer`] - CPU images with clamp/wrap addressing
//! - [`occlusion`] / [`blur`] - occlusion estimate and box blur
//! - [`shading`] - BRDF, tone mapping and debug-view compositing
//! - [`schedule`] / [`timing`] - pass ordering and timing readback policy
//! - [`environment`] - cube faces and the procedural sky
//! - [`reference`] - headless frame renderer

pub mod blur;
pub mod config;
pub mod environment;
pub mod gbuffer;
pub mod kernel;
pub mod occlusion;
pub mod raster;
pub mod reference;
pub mod schedule;
pub mod shading;
pub mod timing;

pub use config::{DebugView, LightKind, LightSource, MaterialParameters, PipelineConfig, SsaoParameters};
pub use kernel::{NoiseTile, OcclusionSampleKernel};
pub use schedule::{FrameScheduler, FrameStep, PassKind};
pub use timing::{FrameTimings, TimingPolicy};

/// Output width in pixels; there is no resize path.
pub const VIEWPORT_WIDTH: u32 = 1280;

/// Output height in pixels.
pub const VIEWPORT_HEIGHT: u32 = 720;

/// Near clip plane used by every camera in the pipeline.
pub const NEAR_PLANE: f32 = 0.1;

/// Far clip plane used by every camera in the pipeline.
pub const FAR_PLANE: f32 = 100.0;
