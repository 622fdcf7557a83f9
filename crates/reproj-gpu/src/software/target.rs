//! CPU render targets.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use image::{Rgba, RgbaImage};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::device::{Extent2D, RenderDevice, RenderTarget, TargetDesc};
use crate::error::{GpuError, Result};

/// Depth value of a cleared depth plane.
const FAR_DEPTH: f32 = 1.0;

/// Color and depth storage of a [`SoftwareTarget`].
#[derive(Debug, Clone)]
pub struct TargetBuffers {
    color: RgbaImage,
    depth: Option<Vec<f32>>,
}

impl TargetBuffers {
    fn new(extent: Extent2D, depth: bool) -> Self {
        Self {
            color: RgbaImage::new(extent.width, extent.height),
            depth: depth.then(|| vec![FAR_DEPTH; extent.area()]),
        }
    }

    /// Dimensions of both planes.
    #[must_use]
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.color.width(), self.color.height())
    }

    /// The color plane.
    #[must_use]
    pub const fn color(&self) -> &RgbaImage {
        &self.color
    }

    /// The color plane, mutably.
    pub fn color_mut(&mut self) -> &mut RgbaImage {
        &mut self.color
    }

    /// The depth plane in row-major order, if present.
    #[must_use]
    pub fn depth(&self) -> Option<&[f32]> {
        self.depth.as_deref()
    }

    /// Fill color with `color` and depth with the far value.
    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.color.pixels_mut() {
            *pixel = Rgba(color);
        }
        if let Some(depth) = &mut self.depth {
            depth.fill(FAR_DEPTH);
        }
    }

    /// Write one fragment. Depth is ignored when no depth plane exists.
    pub fn write(&mut self, x: u32, y: u32, color: [u8; 4], depth: f32) {
        if x >= self.color.width() || y >= self.color.height() {
            return;
        }
        let index = y as usize * self.color.width() as usize + x as usize;
        self.color.put_pixel(x, y, Rgba(color));
        if let Some(plane) = &mut self.depth {
            plane[index] = depth;
        }
    }

    /// Stored depth at a pixel.
    #[must_use]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.color.width() || y >= self.color.height() {
            return None;
        }
        let index = y as usize * self.color.width() as usize + x as usize;
        self.depth.as_ref().map(|plane| plane[index])
    }

    /// Nearest-texel color lookup; `uv` origin is the top-left corner.
    #[must_use]
    pub fn sample_color(&self, uv: Vec2) -> [u8; 4] {
        let (x, y) = self.texel(uv);
        self.color.get_pixel(x, y).0
    }

    /// Nearest-texel depth lookup.
    #[must_use]
    pub fn sample_depth(&self, uv: Vec2) -> Option<f32> {
        let (x, y) = self.texel(uv);
        self.depth_at(x, y)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn texel(&self, uv: Vec2) -> (u32, u32) {
        let width = self.color.width().max(1);
        let height = self.color.height().max(1);
        let x = (uv.x * width as f32).floor().max(0.0) as u32;
        let y = (uv.y * height as f32).floor().max(0.0) as u32;
        (x.min(width - 1), y.min(height - 1))
    }
}

/// A render target in host memory.
#[derive(Debug)]
pub struct SoftwareTarget {
    buffers: RwLock<TargetBuffers>,
    has_depth: bool,
}

impl SoftwareTarget {
    /// Allocate a cleared target.
    #[must_use]
    pub fn new(desc: &TargetDesc) -> Self {
        Self {
            buffers: RwLock::new(TargetBuffers::new(desc.extent, desc.depth)),
            has_depth: desc.depth,
        }
    }

    /// Lock for sampling.
    pub fn read(&self) -> RwLockReadGuard<'_, TargetBuffers> {
        self.buffers.read()
    }

    /// Lock for rendering.
    pub fn write(&self) -> RwLockWriteGuard<'_, TargetBuffers> {
        self.buffers.write()
    }
}

impl RenderTarget for SoftwareTarget {
    fn extent(&self) -> Extent2D {
        self.buffers.read().extent()
    }

    fn has_depth(&self) -> bool {
        self.has_depth
    }

    fn resize(&self, extent: Extent2D) -> Result<()> {
        if extent.is_empty() {
            return Err(GpuError::TargetCreation(format!(
                "cannot resize to {}x{}",
                extent.width, extent.height
            )));
        }
        *self.buffers.write() = TargetBuffers::new(extent, self.has_depth);
        Ok(())
    }
}

/// Device allocating [`SoftwareTarget`]s.
///
/// Writes become visible to readers as soon as the write guard drops, so
/// [`flush`](RenderDevice::flush) only counts calls.
#[derive(Debug, Default)]
pub struct SoftwareDevice {
    flushes: AtomicU64,
}

impl SoftwareDevice {
    /// Create a device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed flushes.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl RenderDevice for SoftwareDevice {
    type Target = SoftwareTarget;

    fn create_target(&self, desc: &TargetDesc) -> Result<SoftwareTarget> {
        if desc.extent.is_empty() {
            return Err(GpuError::TargetCreation(format!(
                "empty target {}x{}",
                desc.extent.width, desc.extent.height
            )));
        }
        Ok(SoftwareTarget::new(desc))
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
