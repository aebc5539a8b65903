//! Error types.

use thiserror::Error;

/// Errors raised while loading or validating [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// Settings JSON is malformed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while building a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fragment shape distribution could not be built.
    #[error("invalid fragment shape weights: {0}")]
    ShapeTable(String),
}

/// Errors raised by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No adapter matched the surface.
    #[error("failed to request GPU adapter: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to hand out a device.
    #[error("failed to request GPU device: {0}")]
    DeviceUnavailable(#[from] wgpu::RequestDeviceError),

    /// The canvas could not back a surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// The surface reported no usable format.
    #[error("surface is not supported by the adapter")]
    SurfaceUnsupported,

    /// Acquiring the next frame failed.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;
