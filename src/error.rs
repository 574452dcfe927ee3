//! Central error handling for the graphterrain renderer
//!
//! Provides a unified RenderError enum with consistent categorization.
//! Device errors are fatal: the owner tears the renderer down and builds a
//! new one instead of resuming. Per-entry data problems never become errors;
//! they are counted in [`crate::sample::SubmitReport`] and logged.

use crate::config::ConfigError;

/// Centralized error type for all renderer operations
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Short category prefix used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            RenderError::Device(_) => "Device",
            RenderError::Upload(_) => "Upload",
            RenderError::Render(_) => "Render",
            RenderError::Surface(_) => "Surface",
            RenderError::Config(_) => "Config",
            RenderError::Io(_) => "IO",
        }
    }

    /// Fatal errors stop the frame scheduler; the display freezes on the
    /// last presented frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Device(_) | RenderError::Surface(_))
    }

    /// Convenience constructors for common error types
    pub fn device<T: ToString>(msg: T) -> Self {
        RenderError::Device(msg.to_string())
    }

    pub fn upload<T: ToString>(msg: T) -> Self {
        RenderError::Upload(msg.to_string())
    }

    pub fn render<T: ToString>(msg: T) -> Self {
        RenderError::Render(msg.to_string())
    }

    pub fn surface<T: ToString>(msg: T) -> Self {
        RenderError::Surface(msg.to_string())
    }
}

impl From<wgpu::Error> for RenderError {
    fn from(err: wgpu::Error) -> Self {
        RenderError::Device(err.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for RenderError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        RenderError::Device(err.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for RenderError {
    fn from(err: wgpu::CreateSurfaceError) -> Self {
        RenderError::Device(err.to_string())
    }
}

/// Result type alias for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_and_surface_errors_are_fatal() {
        assert!(RenderError::device("lost").is_fatal());
        assert!(RenderError::surface("out of memory").is_fatal());
        assert!(!RenderError::upload("bad").is_fatal());
        assert!(!RenderError::render("skip").is_fatal());
    }

    #[test]
    fn display_carries_category_prefix() {
        let err = RenderError::device("shader compile failed");
        assert_eq!(err.to_string(), "Device error: shader compile failed");
        assert_eq!(err.category(), "Device");
    }

    #[test]
    fn config_errors_convert() {
        let err: RenderError = ConfigError::new("width must be positive").into();
        assert_eq!(err.category(), "Config");
        assert!(err.to_string().contains("width must be positive"));
    }
}
