//! The application-supplied pose function.

use reproj_core::Pose;
use reproj_input::KeyTimes;

/// Input deltas fed to a pose function.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoseDelta {
    /// Horizontal cursor movement since the reference pose was sampled
    pub dx: f64,
    /// Vertical cursor movement since the reference pose was sampled
    pub dy: f64,
    /// Seconds since the reference pose was sampled
    pub dt: f64,
}

impl PoseDelta {
    /// Create a new delta.
    #[inline]
    #[must_use]
    pub const fn new(dx: f64, dy: f64, dt: f64) -> Self {
        Self { dx, dy, dt }
    }
}

/// Maps a reference pose and the input since then to a new pose.
///
/// The engine evaluates this on the display thread every tick and again on
/// the application thread for predicted poses, so implementations must be
/// pure: no side effects, and the same inputs always produce the same pose.
/// Orientation does not need to be normalized; the engine does that.
///
/// Closures with the matching signature implement this trait:
///
/// ```ignore
/// engine.register_pose_function(
///     |last: &Pose, delta: PoseDelta, keys: &dyn KeyTimes| -> Pose {
///         let mut pose = last.clone();
///         pose.position.z -= keys.held_time(KeyCode::KeyW) as f32;
///         pose
///     },
/// );
/// ```
pub trait PoseFunction<D>: Send + Sync {
    /// Compute the pose reached from `last` after `delta`.
    fn compute(&self, last: &Pose<D>, delta: PoseDelta, keys: &dyn KeyTimes) -> Pose<D>;
}

impl<D, F> PoseFunction<D> for F
where
    F: Fn(&Pose<D>, PoseDelta, &dyn KeyTimes) -> Pose<D> + Send + Sync,
{
    fn compute(&self, last: &Pose<D>, delta: PoseDelta, keys: &dyn KeyTimes) -> Pose<D> {
        self(last, delta, keys)
    }
}

/// Evaluate `pose_fn` and normalize the resulting orientation.
pub(crate) fn evaluate<D>(
    pose_fn: &dyn PoseFunction<D>,
    last: &Pose<D>,
    delta: PoseDelta,
    keys: &dyn KeyTimes,
) -> Pose<D> {
    pose_fn.compute(last, delta, keys).normalized()
}
