//! Shared helpers for the pipeline and the viewer.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Scalar helpers ([`lerp`], [`smoothstep`]) and ray/box math on glam types

mod error;
mod math;

pub use error::*;
pub use math::*;
