//! Core types, math, and clocks for the reprojection engine.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Camera poses and the input snapshot a pose was derived from
//! - Projection parameters and the warp-quad math
//! - Monotonic and manually driven time sources
//! - Engine-wide error type

pub mod error;
pub mod math;
pub mod pose;
pub mod time;

pub use error::{Error, Result};
pub use math::{Projection, Ray};
pub use pose::{Pose, PoseData, PoseInfo};
pub use time::{ManualClock, MonotonicClock, TimeSource};

/// Engine-wide constants
pub mod constants {
    /// Number of submitted frames kept for display-time prediction.
    pub const POSE_HISTORY_CAPACITY: usize = 10;
    /// Frame interval assumed before enough history exists (60 Hz).
    pub const DEFAULT_DISPLAY_INTERVAL: f64 = 1.0 / 60.0;
    /// Damping applied to the extrapolated time and mouse deltas of a predicted pose.
    pub const PREDICTION_DAMPING: f64 = 0.5;
    /// Iteration bound of the per-pixel parallax ray-march.
    pub const PARALLAX_STEPS: u32 = 32;
    /// Smallest swapchain that still allows one image in flight while another is shown.
    pub const MIN_SWAPCHAIN_IMAGES: usize = 2;
}
