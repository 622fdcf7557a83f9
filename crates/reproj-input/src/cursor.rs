//! Cursor position and capture mode.

use glam::DVec2;

/// Cursor mode for the display window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Normal cursor behavior. Mouse motion does not steer the camera.
    #[default]
    Normal,
    /// Cursor is captured and hidden; motion feeds the pose function.
    Captured,
}

impl CursorMode {
    /// Returns `true` for [`CursorMode::Captured`].
    #[inline]
    #[must_use]
    pub const fn is_captured(self) -> bool {
        matches!(self, Self::Captured)
    }
}

/// Absolute cursor position in window coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CursorState {
    position: DVec2,
}

impl CursorState {
    /// Create a new cursor state at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new absolute position.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = DVec2::new(x, y);
    }

    /// Move the cursor by a relative amount.
    pub fn move_by(&mut self, delta: DVec2) {
        self.position += delta;
    }

    /// Current absolute position.
    #[must_use]
    pub const fn position(&self) -> DVec2 {
        self.position
    }
}
