//! Display host without a window.
//!
//! Presents into a [`SoftwareCompositor`] and takes its input from a script
//! run once per tick. Used by the test harness and the demo.

use std::sync::Arc;

use glam::DVec2;
use reproj_gpu::{PresentSink, SoftwareCompositor, SoftwareDevice};
use reproj_input::{HostInput, KeyboardState};
use tracing::debug;

use crate::host::{DisplayHost, SharedContext};

/// Per-tick input script: `(input, tick, now)`.
pub type InputScript = Box<dyn FnMut(&mut HostInput, u64, f64)>;

/// Offscreen display host.
pub struct HeadlessHost {
    device: Arc<SoftwareDevice>,
    compositor: SoftwareCompositor,
    input: HostInput,
    script: Option<InputScript>,
    ticks: u64,
    max_ticks: Option<u64>,
    close_requested: bool,
    cursor_captured: bool,
    context_current: bool,
}

impl HeadlessHost {
    /// Create a host presenting `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            device: Arc::new(SoftwareDevice::new()),
            compositor: SoftwareCompositor::new(width, height),
            input: HostInput::new(),
            script: None,
            ticks: 0,
            max_ticks: None,
            close_requested: false,
            cursor_captured: false,
            context_current: true,
        }
    }

    /// Close the display after `ticks` refreshes.
    #[must_use]
    pub const fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Drive input from `script`, called after every tick.
    #[must_use]
    pub fn with_input_script(
        mut self,
        script: impl FnMut(&mut HostInput, u64, f64) + 'static,
    ) -> Self {
        self.script = Some(Box::new(script));
        self
    }

    /// Replace the compositor.
    #[must_use]
    pub fn with_compositor(mut self, compositor: SoftwareCompositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Pretend no rendering context is current.
    #[must_use]
    pub const fn without_context(mut self) -> Self {
        self.context_current = false;
        self
    }

    /// Presented frames.
    pub fn present_sink(&self) -> Arc<PresentSink> {
        self.compositor.present_sink()
    }

    /// Input state, for driving the host by hand.
    pub fn input_mut(&mut self) -> &mut HostInput {
        &mut self.input
    }

    /// Returns `true` while the engine asks for a captured cursor.
    pub const fn cursor_captured(&self) -> bool {
        self.cursor_captured
    }

    /// Resize the display surface, as a window-system resize would.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.compositor.resize(width, height);
    }

    /// Refreshes processed so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl DisplayHost for HeadlessHost {
    type Device = SoftwareDevice;
    type Compositor = SoftwareCompositor;
    type SharedContext = HeadlessContext;

    fn has_current_context(&self) -> bool {
        self.context_current
    }

    fn device(&self) -> Arc<SoftwareDevice> {
        Arc::clone(&self.device)
    }

    fn create_shared_context(&mut self) -> reproj_gpu::Result<HeadlessContext> {
        Ok(HeadlessContext { current: false })
    }

    fn compositor(&mut self) -> &mut SoftwareCompositor {
        &mut self.compositor
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        if self.cursor_captured != captured {
            debug!(captured, "Cursor capture changed");
        }
        self.cursor_captured = captured;
    }

    fn keyboard(&self) -> &KeyboardState {
        self.input.keyboard()
    }

    fn cursor_position(&self) -> DVec2 {
        self.input.cursor_position()
    }

    fn poll_events(&mut self, now: f64) {
        self.ticks += 1;
        if let Some(script) = self.script.as_mut() {
            script(&mut self.input, self.ticks, now);
        }
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            self.close_requested = true;
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }
}

/// Application-thread context of a [`HeadlessHost`].
#[derive(Debug)]
pub struct HeadlessContext {
    current: bool,
}

impl HeadlessContext {
    /// Returns `true` while bound to a thread.
    pub const fn is_current(&self) -> bool {
        self.current
    }
}

impl SharedContext for HeadlessContext {
    fn make_current(&mut self) -> reproj_gpu::Result<()> {
        self.current = true;
        Ok(())
    }

    fn release(&mut self) {
        self.current = false;
    }
}
