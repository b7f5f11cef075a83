//! Error types for the rendering pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A render target could not be attached
    #[error("Framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// A pass was asked to run before a resource it reads exists
    #[error("Missing binding for {pass}: {resource}")]
    MissingBinding { pass: &'static str, resource: &'static str },

    /// A frame step ran out of the mandatory order
    #[error("Pass order violated at {step}: {reason}")]
    PassOrder { step: &'static str, reason: String },

    /// Kernel request above the shader limit
    #[error("Kernel size {requested} exceeds maximum {max}")]
    KernelTooLarge { requested: usize, max: usize },

    /// Parameter outside its accepted domain
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Cubemap faces missing or inconsistent
    #[error("Cubemap error in {path}: {reason}")]
    Cubemap { path: PathBuf, reason: String },

    /// Image decode or encode failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Config (de)serialization failure
    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an incomplete-framebuffer error.
    pub fn incomplete(msg: impl Into<String>) -> Self {
        Self::FramebufferIncomplete(msg.into())
    }

    /// Create a pass-order error.
    pub fn pass_order(step: &'static str, reason: impl Into<String>) -> Self {
        Self::PassOrder { step, reason: reason.into() }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::KernelTooLarge { requested: 65, max: 64 };
        assert!(e.to_string().contains("65"));
        assert!(e.to_string().contains("64"));

        let e = Error::MissingBinding { pass: "lighting", resource: "blurred occlusion" };
        assert!(e.to_string().contains("lighting"));
        assert!(e.to_string().contains("blurred occlusion"));

        let e = Error::pass_order("lighting", "occlusion blur not recorded");
        assert!(e.to_string().contains("occlusion blur"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
