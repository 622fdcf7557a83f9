//! CPU reference backend.
//!
//! Render targets are plain RGBA8 images with an `f32` depth plane holding
//! normalized device depth (0 = near, 1 = far). The compositor evaluates the
//! layer warp per pixel on the rayon pool. Useful for headless hosts, tests
//! and as an executable description of what a GPU backend must produce.

mod compositor;
mod target;

pub use compositor::{PresentSink, SoftwareCompositor};
pub use target::{SoftwareDevice, SoftwareTarget, TargetBuffers};
