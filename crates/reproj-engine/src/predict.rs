//! Pose prediction for the application thread.

use glam::DVec2;
use reproj_core::{Pose, PoseInfo};
use reproj_input::KeyTimes;

use crate::config::ReprojectionConfig;
use crate::history::PoseHistory;
use crate::pose_fn::{evaluate, PoseDelta, PoseFunction};

/// Extrapolates poses to an estimated display time.
///
/// Both the time step and the mouse delta are scaled by the damping factor,
/// placing the prediction between the last real sample and the fully
/// extrapolated target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PosePredictor {
    damping: f64,
    default_interval: f64,
}

impl PosePredictor {
    /// Create a predictor.
    #[must_use]
    pub const fn new(damping: f64, default_interval: f64) -> Self {
        Self {
            damping,
            default_interval,
        }
    }

    /// Create a predictor from engine configuration.
    #[must_use]
    pub const fn from_config(config: &ReprojectionConfig) -> Self {
        Self::new(config.prediction_damping, config.default_display_interval)
    }

    /// Estimated display time of the next submitted frame.
    #[must_use]
    pub fn display_time<D>(&self, history: &PoseHistory<D>) -> f64 {
        history.predicted_display_time(self.default_interval)
    }

    /// Damped time step from `now` towards `target_time`, never negative.
    #[must_use]
    pub fn time_step(&self, target_time: f64, now: f64) -> f64 {
        ((target_time - now) * self.damping).max(0.0)
    }

    /// Damped mouse delta between the anchor and the latest display sample.
    #[must_use]
    pub fn mouse_delta(&self, display_mouse: DVec2, anchor_mouse: DVec2, captured: bool) -> DVec2 {
        if captured {
            (display_mouse - anchor_mouse) * self.damping
        } else {
            DVec2::ZERO
        }
    }

    /// Predict the pose at `target_time`.
    ///
    /// `current` is the latest display pose and the input it was sampled
    /// from. The returned [`PoseInfo`] is that sample unchanged, so a frame
    /// rendered with the predicted pose still anchors reprojection to real
    /// input.
    pub fn predict<D: Clone>(
        &self,
        pose_fn: &dyn PoseFunction<D>,
        current: (&Pose<D>, &PoseInfo<D>),
        anchor_mouse: DVec2,
        captured: bool,
        keys: &dyn KeyTimes,
        dt: f64,
    ) -> (Pose<D>, PoseInfo<D>) {
        let (pose, info) = current;
        let mouse = self.mouse_delta(info.mouse, anchor_mouse, captured);
        let predicted = evaluate(pose_fn, pose, PoseDelta::new(mouse.x, mouse.y, dt), keys);
        (predicted, info.clone())
    }
}

impl Default for PosePredictor {
    fn default() -> Self {
        Self::from_config(&ReprojectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use reproj_input::{KeyCode, PredictedKeyTimes};

    use super::*;

    fn strafe(last: &Pose, delta: PoseDelta, keys: &dyn KeyTimes) -> Pose {
        let mut pose = last.clone();
        pose.position.x += keys.held_time(KeyCode::KeyD) as f32;
        pose.orientation *= Quat::from_rotation_y(-delta.dx as f32 * 0.01);
        pose
    }

    #[test]
    fn time_step_is_damped_and_clamped() {
        let predictor = PosePredictor::default();
        assert_relative_eq!(predictor.time_step(1.2, 1.0), 0.1, epsilon = 1e-12);
        assert_eq!(predictor.time_step(0.5, 1.0), 0.0);
    }

    #[test]
    fn released_cursor_zeroes_mouse_delta() {
        let predictor = PosePredictor::default();
        let delta = predictor.mouse_delta(DVec2::new(110.0, 90.0), DVec2::new(100.0, 100.0), true);
        assert_eq!(delta, DVec2::new(5.0, -5.0));
        let delta = predictor.mouse_delta(DVec2::new(110.0, 90.0), DVec2::new(100.0, 100.0), false);
        assert_eq!(delta, DVec2::ZERO);
    }

    #[test]
    fn held_keys_advance_by_predicted_step() {
        let predictor = PosePredictor::default();
        let pose = Pose::default();
        let info = PoseInfo::new(DVec2::new(3.0, 4.0), 2.0, pose.clone());
        let dt = predictor.time_step(2.5, 2.0);
        let keys = PredictedKeyTimes::new([KeyCode::KeyD], dt);

        let (predicted, predicted_info) =
            predictor.predict(&strafe, (&pose, &info), DVec2::new(3.0, 4.0), true, &keys, dt);

        assert!(predicted.position.abs_diff_eq(Vec3::new(0.25, 0.0, 0.0), 1e-6));
        assert_eq!(predicted_info, info);
    }

    #[test]
    fn predicted_orientation_is_unit_length() {
        let predictor = PosePredictor::new(1.0, 1.0 / 60.0);
        let pose = Pose::default();
        let info = PoseInfo::new(DVec2::new(500.0, 0.0), 0.0, pose.clone());
        let keys = PredictedKeyTimes::new([], 0.0);
        let (predicted, _) =
            predictor.predict(&strafe, (&pose, &info), DVec2::ZERO, true, &keys, 0.0);
        assert_relative_eq!(predicted.orientation.length(), 1.0, epsilon = 1e-6);
    }
}
