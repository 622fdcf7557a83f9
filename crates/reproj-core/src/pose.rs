//! Camera poses.

use glam::{DVec2, Mat4, Quat, Vec3};

/// Auxiliary, application-defined state carried inside every [`Pose`].
///
/// Pose functions use it for values that are neither position nor
/// orientation, e.g. accumulated pitch and yaw. Keep it small; it is cloned
/// several times per display tick.
pub trait PoseData: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> PoseData for T {}

/// Position and orientation of the virtual camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose<D = ()> {
    /// World-space position
    pub position: Vec3,
    /// World-space orientation (unit quaternion once normalized)
    pub orientation: Quat,
    /// Application payload
    pub data: D,
}

impl<D: Default> Default for Pose<D> {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            data: D::default(),
        }
    }
}

impl<D> Pose<D> {
    /// Create a new pose.
    #[inline]
    pub const fn new(position: Vec3, orientation: Quat, data: D) -> Self {
        Self {
            position,
            orientation,
            data,
        }
    }

    /// Returns the pose with a unit-length orientation.
    ///
    /// Degenerate orientations (zero length or non-finite) collapse to the
    /// identity rotation rather than propagating NaNs into the warp.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let length = self.orientation.length();
        self.orientation = if length.is_finite() && length > f32::EPSILON {
            self.orientation / length
        } else {
            Quat::IDENTITY
        };
        self
    }

    /// Camera-to-world transform (translation then rotation).
    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// World-to-camera transform.
    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        self.transform().inverse()
    }

    /// Direction the camera looks along (-Z in camera space).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

/// The absolute inputs a pose was computed from.
///
/// Produced once per display tick and carried through submission so the
/// reprojection tick can measure input deltas against the frame that is
/// actually on screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseInfo<D = ()> {
    /// Absolute cursor position when the pose was sampled
    pub mouse: DVec2,
    /// Monotonic time in seconds when the pose was sampled
    pub time: f64,
    /// The non-predicted pose this info belongs to
    pub real_pose: Pose<D>,
}

impl<D> PoseInfo<D> {
    /// Create a new pose info.
    #[inline]
    pub const fn new(mouse: DVec2, time: f64, real_pose: Pose<D>) -> Self {
        Self {
            mouse,
            time,
            real_pose,
        }
    }
}
