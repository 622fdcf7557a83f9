//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
///
/// Every variant except [`Error::Thread`] is a usage-precondition violation:
/// the failing operation has no side effects and must not be retried.
#[derive(Error, Debug)]
pub enum Error {
    /// No rendering context is current on the calling thread.
    #[error("no valid rendering context is current")]
    NoContext,

    /// The engine has not been initialized yet.
    #[error("reprojection engine is not initialized")]
    NotInitialized,

    /// `start_reprojection` was called without a registered pose function.
    #[error("no pose function registered")]
    MissingPoseFunction,

    /// Reprojection is already running (or has already run) on this engine.
    #[error("reprojection already started")]
    AlreadyStarted,

    /// An argument was outside its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Thread creation or join failure
    #[error("thread error: {0}")]
    Thread(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
