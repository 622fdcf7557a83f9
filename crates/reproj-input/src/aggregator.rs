//! Engine-side input aggregation.

use tracing::trace;
use winit::keyboard::KeyCode;

use crate::cursor::CursorMode;
use crate::held::{HeldKeyTimes, PredictedKeyTimes};
use crate::keyboard::KeyboardState;

/// Accumulates held-key durations between frame submissions.
///
/// The display thread calls [`sync_keyboard`](Self::sync_keyboard) and
/// [`accumulate`](Self::accumulate) every tick; submission calls
/// [`reset_epoch`](Self::reset_epoch). Keys still held across a reset start
/// again from zero on the next tick.
#[derive(Debug, Default)]
pub struct InputAggregator {
    pressed: KeyboardState,
    held: HeldKeyTimes,
    mode: CursorMode,
}

impl InputAggregator {
    /// Create an aggregator with nothing held and the cursor released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pressed-key snapshot with the host's current state.
    pub fn sync_keyboard(&mut self, keyboard: &KeyboardState) {
        self.pressed.clone_from(keyboard);
    }

    /// Add `elapsed` seconds to every currently pressed key.
    pub fn accumulate(&mut self, elapsed: f64) {
        self.held.accumulate(self.pressed.pressed_keys(), elapsed);
    }

    /// Start a new accumulation epoch.
    pub fn reset_epoch(&mut self) {
        trace!(keys = self.held.len(), "Resetting held key times");
        self.held.clear();
    }

    /// Held durations of the current epoch.
    #[must_use]
    pub const fn held_times(&self) -> &HeldKeyTimes {
        &self.held
    }

    /// Returns `true` if `key` was down at the last sync.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.is_pressed(key)
    }

    /// Lookup reporting `dt` for every key down at the last sync.
    #[must_use]
    pub fn predicted_key_times(&self, dt: f64) -> PredictedKeyTimes {
        PredictedKeyTimes::new(self.pressed.pressed_keys(), dt)
    }

    /// Forward mouse motion to pose computation.
    pub fn capture_cursor(&mut self) {
        self.mode = CursorMode::Captured;
    }

    /// Stop forwarding mouse motion.
    pub fn release_cursor(&mut self) {
        self.mode = CursorMode::Normal;
    }

    /// Current cursor mode.
    #[must_use]
    pub const fn cursor_mode(&self) -> CursorMode {
        self.mode
    }

    /// Returns `true` if mouse motion is forwarded.
    #[must_use]
    pub const fn is_captured(&self) -> bool {
        self.mode.is_captured()
    }
}
