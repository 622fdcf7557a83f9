//! Keyboard state tracking.

use hashbrown::HashMap;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keys currently held down, each with the time it went down.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct KeyboardState {
    pressed: HashMap<KeyCode, f64>,
}

impl KeyboardState {
    /// Create a new keyboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a key event observed at `now`.
    ///
    /// Auto-repeat presses keep the original press timestamp.
    pub fn process_key_event(&mut self, event: &KeyEvent, now: f64) {
        let PhysicalKey::Code(key_code) = event.physical_key else {
            return;
        };

        match event.state {
            ElementState::Pressed => self.press(key_code, now),
            ElementState::Released => self.release(key_code),
        }
    }

    /// Mark `key` as down since `at`. Already-held keys are unchanged.
    pub fn press(&mut self, key: KeyCode, at: f64) {
        self.pressed.entry(key).or_insert(at);
    }

    /// Mark `key` as up.
    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    /// Returns `true` if the key is currently pressed.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains_key(&key)
    }

    /// Time at which a held key went down.
    #[must_use]
    pub fn pressed_at(&self, key: KeyCode) -> Option<f64> {
        self.pressed.get(&key).copied()
    }

    /// Iterate over the held keys.
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.pressed.keys().copied()
    }

    /// Number of held keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    /// Returns `true` if no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Release every key.
    pub fn clear(&mut self) {
        self.pressed.clear();
    }
}
