//! Asynchronous reprojection engine.
//!
//! The application renders frames at whatever rate it can sustain on its own
//! thread. The display thread re-presents the most recent frame every refresh,
//! warped to the freshest camera pose computed from live input, so head motion
//! stays smooth even when rendering falls behind.
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = Reprojection::new(host, ReprojectionConfig::default());
//! engine.initialize()?;
//! engine.register_pose_function(fly_camera);
//! engine.update_projection(0.1, 100.0, 1.2, 16.0 / 9.0)?;
//! engine.start_reprojection(|ctx| {
//!     let swapchain = ctx.create_swapchain(SwapchainDesc::new(1280, 720, 3))?;
//!     while let Some(index) = ctx.acquire_image(&swapchain) {
//!         let target = ctx.predicted_display_time();
//!         let (pose, info) = ctx.predicted_camera_pose(target);
//!         render(&swapchain, index, &pose);
//!         let layer = FrameLayer::new(Arc::clone(&swapchain), index, 1.2);
//!         ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;
//!     }
//!     Ok(())
//! })?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod headless;
pub mod history;
pub mod host;
pub mod lifecycle;
pub mod pose_fn;
pub mod predict;
pub mod runner;
mod tick;
pub mod warp;

pub use config::ReprojectionConfig;
pub use context::AppContext;
pub use error::{ReprojectionError, Result};
pub use frame::{FrameLayer, FrameLayerFlags, FrameSubmitInfo};
pub use headless::{HeadlessContext, HeadlessHost, InputScript};
pub use history::PoseHistory;
pub use host::{DisplayHost, SharedContext};
pub use lifecycle::{RunState, ShutdownHandle};
pub use pose_fn::{PoseDelta, PoseFunction};
pub use predict::PosePredictor;
pub use runner::{HostTarget, Reprojection, ReprojectionStats};
pub use warp::Warp;

/// Install the default `tracing` subscriber.
///
/// Filters with `RUST_LOG`, falling back to `info`. Does nothing if a
/// subscriber is already installed.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
