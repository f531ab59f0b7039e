//! Rendering error types.

use pickpass_core::PickError;
use thiserror::Error;

/// Errors that can occur while setting up or driving the wgpu backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// The id target has a zero-sized dimension.
    #[error("invalid id target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },

    /// Mapping the readback buffer failed.
    #[error("readback buffer mapping failed: {0}")]
    BufferMapFailed(#[from] wgpu::BufferAsyncError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for PickError {
    fn from(err: RenderError) -> Self {
        PickError::Backend(err.to_string())
    }
}
