//! # glengine
//!
//! Real-time deferred renderer: a G-Buffer geometry pass, screen-space
//! ambient occlusion with a box blur, a Cook-Torrance lighting pass over
//! three point lights, and a forward overlay that draws light markers and an
//! environment cube on top of the composited frame.
//!
//! ## Modules
//!
//! - [`util`] - Errors and small math helpers
//! - [`pipeline`] - Frame composition on the CPU: parameters, SSAO kernel and
//!   noise, pass ordering, timing policy and a headless reference renderer
//! - [`logging`] - tracing subscriber setup
//! - `viewer` - wgpu/egui window running the GPU passes (feature `viewer`)
//!
//! ## Example
//!
//! ```no_run
//! use glengine::pipeline::environment::ProceduralSky;
//! use glengine::pipeline::reference::{ReferenceCamera, ReferenceRenderer, ReferenceScene};
//! use glengine::pipeline::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! let mut renderer = ReferenceRenderer::new(Some(42))?;
//! let frame = renderer.render(
//!     &config,
//!     &ReferenceScene::default(),
//!     &ReferenceCamera::default(),
//!     &ProceduralSky::default(),
//!     320,
//!     180,
//! )?;
//! frame.save_png("frame.png".as_ref())?;
//! # Ok::<(), glengine::Error>(())
//! ```

pub mod util;
pub mod pipeline;
pub mod logging;

// Window, GPU passes and overlay (optional, enabled with "viewer" feature)
#[cfg(feature = "viewer")]
pub mod viewer;

pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::pipeline::{
        DebugView, FrameScheduler, FrameStep, FrameTimings, LightSource, MaterialParameters,
        NoiseTile, OcclusionSampleKernel, PassKind, PipelineConfig, SsaoParameters, TimingPolicy,
    };
    pub use crate::pipeline::environment::{CubemapFaces, Environment, ProceduralSky};
    pub use crate::pipeline::reference::{ReferenceCamera, ReferenceRenderer, ReferenceScene};
}
