//! Display host seam.
//!
//! The host owns the visible surface, the primary rendering context and the
//! window-system input. The engine drives it from the display thread.

use std::sync::Arc;

use glam::DVec2;
use reproj_gpu::{Compositor, RenderDevice};
use reproj_input::KeyboardState;

/// A rendering context that shares resources with the host's primary one.
///
/// Handed to the application thread, which makes it current before running
/// the application entry point.
pub trait SharedContext: Send + 'static {
    /// Bind the context to the calling thread.
    fn make_current(&mut self) -> reproj_gpu::Result<()>;

    /// Unbind the context from the calling thread.
    fn release(&mut self);
}

/// Window system, primary context and presentation surface.
pub trait DisplayHost {
    /// Device shared by every context of this host.
    type Device: RenderDevice;
    /// Presentation surface.
    type Compositor: Compositor<Target = <Self::Device as RenderDevice>::Target>;
    /// Secondary context type for the application thread.
    type SharedContext: SharedContext;

    /// Returns `true` if a valid rendering context is current on this thread.
    fn has_current_context(&self) -> bool;

    /// The device behind the primary context.
    fn device(&self) -> Arc<Self::Device>;

    /// Create a hidden context sharing resources with the primary one.
    fn create_shared_context(&mut self) -> reproj_gpu::Result<Self::SharedContext>;

    /// The presentation surface.
    fn compositor(&mut self) -> &mut Self::Compositor;

    /// Hide and lock the cursor, or give it back.
    fn set_cursor_captured(&mut self, captured: bool);

    /// Keys currently down.
    fn keyboard(&self) -> &KeyboardState;

    /// Absolute cursor position.
    fn cursor_position(&self) -> DVec2;

    /// Process pending window-system events.
    fn poll_events(&mut self, now: f64);

    /// Returns `true` once the display surface was asked to close.
    fn should_close(&self) -> bool;

    /// Ask the display surface to close.
    fn request_close(&mut self);
}
