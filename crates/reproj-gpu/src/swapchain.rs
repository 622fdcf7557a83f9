//! Swapchain ring with blocking acquire/release.
//!
//! The application thread acquires images in round-robin order and renders
//! into them; the engine releases an image once a newer submission replaces
//! the layer that referenced it. When the producer gets a full ring ahead of
//! the display, [`Swapchain::acquire_image`] blocks until an image comes
//! back. That stall is the only backpressure between the two threads.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use reproj_core::constants::MIN_SWAPCHAIN_IMAGES;
use tracing::{debug, error, info, warn};

use crate::context::GpuContext;
use crate::device::{Extent2D, RenderDevice, RenderTarget, TargetDesc};
use crate::error::{GpuError, Result};

/// Swapchain creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Width of every image in pixels
    pub width: u32,
    /// Height of every image in pixels
    pub height: u32,
    /// Number of images in the ring (at least two)
    pub image_count: usize,
    /// Pair each image with a depth buffer
    pub depth: bool,
}

impl SwapchainDesc {
    /// Images with color and depth storage.
    #[must_use]
    pub const fn new(width: u32, height: u32, image_count: usize) -> Self {
        Self {
            width,
            height,
            image_count,
            depth: true,
        }
    }

    /// Enable or disable the paired depth buffers.
    #[must_use]
    pub const fn with_depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }

    /// Image dimensions.
    #[must_use]
    pub const fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// Acquisition state guarded by the swapchain mutex.
struct Ring {
    acquired: Vec<bool>,
    index: usize,
    extent: Extent2D,
}

impl Ring {
    fn current_is_acquired(&self) -> bool {
        self.acquired[self.index]
    }

    fn claim(&mut self) -> usize {
        let index = self.index;
        self.acquired[index] = true;
        self.index = (index + 1) % self.acquired.len();
        index
    }
}

/// A fixed ring of render targets shared by the application and display threads.
pub struct Swapchain<T> {
    images: Vec<T>,
    ring: Mutex<Ring>,
    available: Condvar,
}

impl<T: RenderTarget> Swapchain<T> {
    /// Allocate a swapchain on an initialized context.
    ///
    /// Fails with [`GpuError::NotInitialized`] if the context has not been
    /// initialized. This is a usage error; nothing is allocated.
    pub fn new<G>(context: &GpuContext<G>, desc: SwapchainDesc) -> Result<Self>
    where
        G: RenderDevice<Target = T>,
    {
        if !context.is_initialized() {
            error!("Swapchain created before the rendering context was initialized");
            return Err(GpuError::NotInitialized);
        }
        if desc.image_count < MIN_SWAPCHAIN_IMAGES {
            return Err(GpuError::InvalidSwapchain(format!(
                "need at least {MIN_SWAPCHAIN_IMAGES} images, got {}",
                desc.image_count
            )));
        }
        let extent = desc.extent();
        if extent.is_empty() {
            return Err(GpuError::InvalidSwapchain(format!(
                "image size must be non-zero, got {}x{}",
                extent.width, extent.height
            )));
        }

        let target = TargetDesc {
            extent,
            depth: desc.depth,
        };
        let images = (0..desc.image_count)
            .map(|_| context.device().create_target(&target))
            .collect::<Result<Vec<_>>>()?;

        info!(
            width = extent.width,
            height = extent.height,
            images = desc.image_count,
            depth = desc.depth,
            "Created swapchain"
        );

        Ok(Self {
            images,
            ring: Mutex::new(Ring {
                acquired: vec![false; desc.image_count],
                index: 0,
                extent,
            }),
            available: Condvar::new(),
        })
    }

    /// Claim the next image in ring order, blocking while it is still held.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn acquire_image(&self) -> usize {
        let mut ring = self.ring.lock();
        if ring.current_is_acquired() {
            debug!(index = ring.index, "Swapchain exhausted, waiting for release");
            while ring.current_is_acquired() {
                self.available.wait(&mut ring);
            }
        }
        ring.claim()
    }

    /// Claim the next image if it is free right now.
    pub fn try_acquire_image(&self) -> Option<usize> {
        let mut ring = self.ring.lock();
        if ring.current_is_acquired() {
            None
        } else {
            Some(ring.claim())
        }
    }

    /// Claim the next image, giving up after `timeout`.
    pub fn acquire_image_timeout(&self, timeout: Duration) -> Option<usize> {
        let deadline = Instant::now() + timeout;
        let mut ring = self.ring.lock();
        while ring.current_is_acquired() {
            if self.available.wait_until(&mut ring, deadline).timed_out() {
                if ring.current_is_acquired() {
                    return None;
                }
                break;
            }
        }
        Some(ring.claim())
    }

    /// Return an image to the ring and wake any waiting acquirer.
    ///
    /// The engine calls this when a submission replaces the layer that held
    /// the image; applications never release images themselves.
    pub fn release_image(&self, index: usize) -> Result<()> {
        let mut ring = self.ring.lock();
        let len = ring.acquired.len();
        let Some(slot) = ring.acquired.get_mut(index) else {
            return Err(GpuError::ImageIndexOutOfRange { index, len });
        };
        if !*slot {
            warn!(index, "Released an image that was not acquired");
            return Ok(());
        }
        *slot = false;
        drop(ring);
        self.available.notify_all();
        Ok(())
    }

    /// Re-specify every image at a new size, keeping the image count.
    ///
    /// Serialized with acquire and release through the ring mutex.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        let extent = Extent2D::new(width, height);
        if extent.is_empty() {
            return Err(GpuError::InvalidSwapchain(format!(
                "image size must be non-zero, got {width}x{height}"
            )));
        }

        let mut ring = self.ring.lock();
        if ring.extent == extent {
            return Ok(());
        }
        for image in &self.images {
            image.resize(extent)?;
        }
        ring.extent = extent;
        debug!(width, height, "Resized swapchain");
        Ok(())
    }

    /// Get an image by index.
    pub fn image(&self, index: usize) -> Result<&T> {
        self.images.get(index).ok_or(GpuError::ImageIndexOutOfRange {
            index,
            len: self.images.len(),
        })
    }

    /// Number of images in the ring.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Current image dimensions.
    pub fn extent(&self) -> Extent2D {
        self.ring.lock().extent
    }

    /// Returns `true` if the image is currently claimed.
    pub fn is_acquired(&self, index: usize) -> bool {
        self.ring.lock().acquired.get(index).copied().unwrap_or(false)
    }

    /// Number of images currently claimed.
    pub fn acquired_count(&self) -> usize {
        self.ring.lock().acquired.iter().filter(|a| **a).count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::software::SoftwareDevice;

    fn context() -> GpuContext<SoftwareDevice> {
        let context = GpuContext::new(Arc::new(SoftwareDevice::new()));
        context.initialize();
        context
    }

    #[test]
    fn creation_requires_initialized_context() {
        let context = GpuContext::new(Arc::new(SoftwareDevice::new()));
        let result = Swapchain::new(&context, SwapchainDesc::new(4, 4, 2));
        assert!(matches!(result, Err(GpuError::NotInitialized)));
    }

    #[test]
    fn rejects_single_image_ring() {
        let result = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 1));
        assert!(matches!(result, Err(GpuError::InvalidSwapchain(_))));
    }

    #[test]
    fn rejects_empty_images() {
        let result = Swapchain::new(&context(), SwapchainDesc::new(0, 4, 2));
        assert!(matches!(result, Err(GpuError::InvalidSwapchain(_))));
    }

    #[test]
    fn acquires_round_robin() {
        let swapchain = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 3)).unwrap();
        assert_eq!(swapchain.acquire_image(), 0);
        assert_eq!(swapchain.acquire_image(), 1);
        assert_eq!(swapchain.acquire_image(), 2);
        assert_eq!(swapchain.try_acquire_image(), None);
        assert_eq!(swapchain.acquired_count(), 3);
    }

    #[test]
    fn release_out_of_range_is_error() {
        let swapchain = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 2)).unwrap();
        assert!(matches!(
            swapchain.release_image(5),
            Err(GpuError::ImageIndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn double_release_is_harmless() {
        let swapchain = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 2)).unwrap();
        let index = swapchain.acquire_image();
        swapchain.release_image(index).unwrap();
        swapchain.release_image(index).unwrap();
        assert!(!swapchain.is_acquired(index));
    }

    #[test]
    fn timed_acquire_gives_up() {
        let swapchain = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 2)).unwrap();
        swapchain.acquire_image();
        swapchain.acquire_image();
        assert_eq!(swapchain.acquire_image_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn release_wakes_blocked_acquirer() {
        let swapchain =
            Arc::new(Swapchain::new(&context(), SwapchainDesc::new(4, 4, 2)).unwrap());
        swapchain.acquire_image();
        swapchain.acquire_image();

        let waiter = {
            let swapchain = Arc::clone(&swapchain);
            thread::spawn(move || swapchain.acquire_image_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        swapchain.release_image(0).unwrap();

        assert_eq!(waiter.join().unwrap(), Some(0));
        assert!(swapchain.is_acquired(0));
    }

    #[test]
    fn resize_keeps_image_count() {
        let swapchain = Swapchain::new(&context(), SwapchainDesc::new(4, 4, 3)).unwrap();
        swapchain.resize(8, 2).unwrap();
        assert_eq!(swapchain.extent(), Extent2D::new(8, 2));
        assert_eq!(swapchain.image_count(), 3);
        for index in 0..3 {
            assert_eq!(swapchain.image(index).unwrap().extent(), Extent2D::new(8, 2));
        }
        assert!(swapchain.resize(0, 2).is_err());
    }
}
