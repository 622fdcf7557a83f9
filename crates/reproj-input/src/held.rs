//! Held-key durations and the lookup capability handed to pose functions.

use hashbrown::{HashMap, HashSet};
use winit::keyboard::KeyCode;

/// Lookup of how long a key has been held, in seconds.
///
/// Pose functions receive this instead of a map so the engine can swap in a
/// synthetic lookup when predicting future poses. Keys that are not held
/// report zero.
pub trait KeyTimes {
    /// Seconds `key` has been held during the current epoch.
    fn held_time(&self, key: KeyCode) -> f64;
}

impl<F> KeyTimes for F
where
    F: Fn(KeyCode) -> f64,
{
    fn held_time(&self, key: KeyCode) -> f64 {
        self(key)
    }
}

/// Cumulative hold duration per key since the last submitted frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeldKeyTimes {
    times: HashMap<KeyCode, f64>,
}

impl HeldKeyTimes {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` seconds to every key in `pressed`.
    pub fn accumulate(&mut self, pressed: impl IntoIterator<Item = KeyCode>, elapsed: f64) {
        let elapsed = elapsed.max(0.0);
        for key in pressed {
            *self.times.entry(key).or_insert(0.0) += elapsed;
        }
    }

    /// Forget every duration.
    pub fn clear(&mut self) {
        self.times.clear();
    }

    /// Number of keys with a recorded duration.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns `true` if nothing has been accumulated this epoch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over `(key, seconds)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (KeyCode, f64)> + '_ {
        self.times.iter().map(|(key, time)| (*key, *time))
    }
}

impl KeyTimes for HeldKeyTimes {
    fn held_time(&self, key: KeyCode) -> f64 {
        self.times.get(&key).copied().unwrap_or(0.0)
    }
}

/// Key lookup used for predicted poses.
///
/// Every key held at prediction time is assumed to stay held for exactly the
/// predicted interval; every other key reports zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedKeyTimes {
    pressed: HashSet<KeyCode>,
    dt: f64,
}

impl PredictedKeyTimes {
    /// Create a lookup reporting `dt` for each key in `pressed`.
    pub fn new(pressed: impl IntoIterator<Item = KeyCode>, dt: f64) -> Self {
        Self {
            pressed: pressed.into_iter().collect(),
            dt,
        }
    }

    /// The interval reported for held keys.
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }
}

impl KeyTimes for PredictedKeyTimes {
    fn held_time(&self, key: KeyCode) -> f64 {
        if self.pressed.contains(&key) {
            self.dt
        } else {
            0.0
        }
    }
}
