//! GPU error types.

use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Resource creation was attempted before the context was initialized.
    #[error("rendering context is not initialized")]
    NotInitialized,

    /// Swapchain parameters were rejected.
    #[error("invalid swapchain: {0}")]
    InvalidSwapchain(String),

    /// An image index does not name an image of the swapchain.
    #[error("image index {index} out of range for swapchain of {len} images")]
    ImageIndexOutOfRange {
        /// The offending index
        index: usize,
        /// Number of images in the swapchain
        len: usize,
    },

    /// Render target allocation failed.
    #[error("render target creation failed: {0}")]
    TargetCreation(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// A secondary context could not be created.
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    /// Invalid state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
