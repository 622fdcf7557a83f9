//! Engine error type.

use reproj_gpu::GpuError;
use thiserror::Error;

/// Errors surfaced by the reprojection engine.
#[derive(Error, Debug)]
pub enum ReprojectionError {
    /// Usage error or thread failure.
    #[error(transparent)]
    Core(#[from] reproj_core::Error),

    /// Render resource failure.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// The application entry point returned an error or panicked.
    #[error("application thread failed: {0}")]
    AppThread(String),
}

impl From<std::io::Error> for ReprojectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Core(reproj_core::Error::Thread(err))
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, ReprojectionError>;
