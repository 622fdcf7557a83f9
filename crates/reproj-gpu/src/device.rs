//! Render device and render target seams.

use crate::error::Result;

/// Size of a render target in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent2D {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent2D {
    /// Create a new extent.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels.
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width divided by height.
    #[inline]
    #[must_use]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Parameters of a single render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    /// Pixel dimensions
    pub extent: Extent2D,
    /// Allocate a depth buffer alongside the color buffer
    pub depth: bool,
}

/// A color buffer with an optional paired depth buffer.
///
/// Targets are shared between the application thread (which renders into
/// them) and the display thread (which samples them), so resizing goes
/// through `&self`.
pub trait RenderTarget: Send + Sync + 'static {
    /// Current dimensions.
    fn extent(&self) -> Extent2D;

    /// Returns `true` if a depth buffer is attached.
    fn has_depth(&self) -> bool;

    /// Re-specify storage at a new size. Contents are undefined afterwards.
    fn resize(&self, extent: Extent2D) -> Result<()>;
}

/// Allocator of render targets, shared by every rendering context.
pub trait RenderDevice: Send + Sync + 'static {
    /// Render target type produced by this device.
    type Target: RenderTarget;

    /// Allocate a new render target.
    fn create_target(&self, desc: &TargetDesc) -> Result<Self::Target>;

    /// Block until all previously issued work is complete and visible to
    /// other contexts.
    fn flush(&self) -> Result<()>;
}
