//! Engine configuration.

use std::time::Duration;

use reproj_core::constants::{
    DEFAULT_DISPLAY_INTERVAL, PARALLAX_STEPS, POSE_HISTORY_CAPACITY, PREDICTION_DAMPING,
};
use reproj_core::Error;
use serde::{Deserialize, Serialize};

/// Reprojection engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectionConfig {
    /// Submitted frames kept for display-time prediction.
    pub history_capacity: usize,
    /// Frame interval assumed until two frames have been submitted (seconds).
    pub default_display_interval: f64,
    /// Factor applied to the extrapolated time and mouse deltas of predicted poses.
    pub prediction_damping: f64,
    /// Iterations of the parallax ray-march.
    pub parallax_steps: u32,
    /// Camera translation below which parallax layers use the plain warp.
    pub parallax_epsilon: f32,
    /// Display ticks per second for hosts without vsync (None for unlimited).
    pub target_tick_rate: Option<u32>,
    /// Name of the application thread.
    pub app_thread_name: String,
    /// Display clear color (linear RGBA).
    pub clear_color: [f32; 4],
}

impl Default for ReprojectionConfig {
    fn default() -> Self {
        Self {
            history_capacity: POSE_HISTORY_CAPACITY,
            default_display_interval: DEFAULT_DISPLAY_INTERVAL,
            prediction_damping: PREDICTION_DAMPING,
            parallax_steps: PARALLAX_STEPS,
            parallax_epsilon: 1e-5,
            target_tick_rate: None,
            app_thread_name: "reprojection-app".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl ReprojectionConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pose history capacity.
    #[must_use]
    pub const fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the fallback display interval.
    #[must_use]
    pub const fn with_default_display_interval(mut self, seconds: f64) -> Self {
        self.default_display_interval = seconds;
        self
    }

    /// Set the prediction damping factor.
    #[must_use]
    pub const fn with_prediction_damping(mut self, damping: f64) -> Self {
        self.prediction_damping = damping;
        self
    }

    /// Set the parallax ray-march iteration count.
    #[must_use]
    pub const fn with_parallax_steps(mut self, steps: u32) -> Self {
        self.parallax_steps = steps;
        self
    }

    /// Set the display tick rate.
    #[must_use]
    pub const fn with_target_tick_rate(mut self, rate: u32) -> Self {
        self.target_tick_rate = Some(rate);
        self
    }

    /// Set the application thread name.
    #[must_use]
    pub fn with_app_thread_name(mut self, name: impl Into<String>) -> Self {
        self.app_thread_name = name.into();
        self
    }

    /// Set the display clear color.
    #[must_use]
    pub const fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Minimum duration of one display tick, if paced.
    #[must_use]
    pub fn target_tick_interval(&self) -> Option<Duration> {
        self.target_tick_rate
            .filter(|rate| *rate > 0)
            .map(|rate| Duration::from_nanos(1_000_000_000 / u64::from(rate)))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), Error> {
        if self.history_capacity < 2 {
            return Err(Error::InvalidArgument(format!(
                "history capacity must be at least 2, got {}",
                self.history_capacity
            )));
        }
        if !(self.default_display_interval.is_finite() && self.default_display_interval > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "default display interval must be positive, got {}",
                self.default_display_interval
            )));
        }
        if !(self.prediction_damping.is_finite() && self.prediction_damping >= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "prediction damping must be non-negative, got {}",
                self.prediction_damping
            )));
        }
        if self.parallax_epsilon < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "parallax epsilon must be non-negative, got {}",
                self.parallax_epsilon
            )));
        }
        Ok(())
    }
}
