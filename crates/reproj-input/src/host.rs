//! Host-side input state fed from window events.

use glam::DVec2;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

use crate::cursor::CursorState;
use crate::keyboard::KeyboardState;

/// What the display host knows about input at any instant.
///
/// The engine never sees raw events; it reads [`HostInput::keyboard`] and
/// [`HostInput::cursor_position`] once per tick.
#[derive(Debug, Default, Clone)]
pub struct HostInput {
    keyboard: KeyboardState,
    cursor: CursorState,
}

impl HostInput {
    /// Create empty input state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a winit window event observed at `now`.
    ///
    /// Returns `true` if the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent, now: f64) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_key_event(event, now);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor.set_position(position.x, position.y);
                true
            }
            WindowEvent::Focused(false) => {
                // Release events are lost while unfocused.
                self.keyboard.clear();
                true
            }
            _ => false,
        }
    }

    /// Press a key at `now` (scripted input).
    pub fn press(&mut self, key: KeyCode, now: f64) {
        self.keyboard.press(key, now);
    }

    /// Release a key (scripted input).
    pub fn release(&mut self, key: KeyCode) {
        self.keyboard.release(key);
    }

    /// Move the cursor to an absolute position.
    pub fn set_cursor_position(&mut self, x: f64, y: f64) {
        self.cursor.set_position(x, y);
    }

    /// Move the cursor relative to its current position.
    pub fn move_cursor(&mut self, dx: f64, dy: f64) {
        self.cursor.move_by(DVec2::new(dx, dy));
    }

    /// Keys currently down.
    #[must_use]
    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Absolute cursor position.
    #[must_use]
    pub const fn cursor_position(&self) -> DVec2 {
        self.cursor.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    #[test]
    fn cursor_moved_updates_position() {
        let mut input = HostInput::new();
        let event = WindowEvent::CursorMoved {
            // SAFETY: dummy ids are only compared, never dereferenced.
            device_id: unsafe { DeviceId::dummy() },
            position: PhysicalPosition::new(320.0, 240.0),
        };

        assert!(input.process_window_event(&event, 0.0));
        assert_eq!(input.cursor_position(), DVec2::new(320.0, 240.0));
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut input = HostInput::new();
        input.press(KeyCode::KeyW, 0.0);
        assert!(input.process_window_event(&WindowEvent::Focused(false), 1.0));
        assert!(input.keyboard().is_empty());
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut input = HostInput::new();
        assert!(!input.process_window_event(&WindowEvent::Focused(true), 0.0));
    }

    #[test]
    fn scripted_motion_accumulates() {
        let mut input = HostInput::new();
        input.set_cursor_position(10.0, 10.0);
        input.move_cursor(5.0, -2.0);
        assert_eq!(input.cursor_position(), DVec2::new(15.0, 8.0));
    }
}
