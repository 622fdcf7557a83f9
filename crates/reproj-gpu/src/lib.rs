//! Render-target abstraction for the reprojection engine.
//!
//! This crate provides:
//! - The device seam ([`RenderDevice`], [`RenderTarget`]) the engine allocates through
//! - [`GpuContext`], which gates resource creation on an initialized context
//! - [`Swapchain`], a ring of render targets with blocking acquire/release
//! - The [`Compositor`] seam and the per-layer [`WarpUniforms`]
//! - A CPU reference backend in [`software`]

pub mod compositor;
pub mod context;
pub mod device;
pub mod error;
pub mod software;
pub mod swapchain;

pub use compositor::{Compositor, LayerDraw, WarpUniforms};
pub use context::GpuContext;
pub use device::{Extent2D, RenderDevice, RenderTarget, TargetDesc};
pub use error::{GpuError, Result};
pub use software::{PresentSink, SoftwareCompositor, SoftwareDevice, SoftwareTarget, TargetBuffers};
pub use swapchain::{Swapchain, SwapchainDesc};
