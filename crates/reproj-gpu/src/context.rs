//! Rendering context gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::device::RenderDevice;
use crate::error::{GpuError, Result};

/// Device handle plus the "context is ready" flag.
///
/// Resources may only be created once the host has established a rendering
/// context and the engine has been initialized against it.
pub struct GpuContext<G> {
    device: Arc<G>,
    initialized: AtomicBool,
}

impl<G: RenderDevice> GpuContext<G> {
    /// Wrap a device. The context starts uninitialized.
    pub fn new(device: Arc<G>) -> Self {
        Self {
            device,
            initialized: AtomicBool::new(false),
        }
    }

    /// Mark the context ready for resource creation.
    pub fn initialize(&self) {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            info!("Rendering context initialized");
        }
    }

    /// Returns `true` once [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get the device.
    pub fn device(&self) -> &G {
        &self.device
    }

    /// Get a shared handle to the device.
    pub fn device_arc(&self) -> Arc<G> {
        Arc::clone(&self.device)
    }

    /// Wait for outstanding device work.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn flush(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(GpuError::NotInitialized);
        }
        self.device.flush()
    }
}
