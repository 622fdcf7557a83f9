//! Test harness for the reprojection engine.
//!
//! Runs the engine against a headless host on a manually driven clock, with
//! scripted input and pixel comparison of the presented frames.

pub mod fixtures;
pub mod harness;

pub use fixtures::{fill_target, identity_pose, FlyCamera};
pub use harness::{
    compare_images, diff_image, HarnessReport, InputAction, ReprojectionHarness, ScriptedInput,
    wait_until,
};

use reproj_engine::ReprojectionError;
use reproj_gpu::GpuError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Engine error: {0}")]
    Engine(#[from] ReprojectionError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Image comparison failed: {0}")]
    ImageComparison(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Visual check configuration.
#[derive(Debug, Clone)]
pub struct VisualTestConfig {
    /// Maximum allowed pixel difference (0.0-1.0).
    pub threshold: f64,
    /// Directory for test output images.
    pub output_dir: String,
}

impl Default for VisualTestConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            output_dir: "target/test_output".to_string(),
        }
    }
}
