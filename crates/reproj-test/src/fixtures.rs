//! Pose functions and render helpers shared by tests.

use glam::{Quat, Vec3};
use reproj_core::Pose;
use reproj_engine::{PoseDelta, PoseFunction};
use reproj_gpu::SoftwareTarget;
use reproj_input::{KeyCode, KeyTimes};

/// Pose function that never moves the camera.
pub fn identity_pose(last: &Pose, _delta: PoseDelta, _keys: &dyn KeyTimes) -> Pose {
    last.clone()
}

/// WASD movement with mouse look.
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    /// Units per second of held key.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            speed: 2.0,
            sensitivity: 0.002,
        }
    }
}

impl FlyCamera {
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub const fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }
}

impl PoseFunction<()> for FlyCamera {
    fn compute(&self, last: &Pose, delta: PoseDelta, keys: &dyn KeyTimes) -> Pose {
        let yaw = Quat::from_rotation_y(-delta.dx as f32 * self.sensitivity);
        let pitch = Quat::from_rotation_x(-delta.dy as f32 * self.sensitivity);
        let orientation = yaw * last.orientation * pitch;

        let axis = |positive: KeyCode, negative: KeyCode| {
            (keys.held_time(positive) - keys.held_time(negative)) as f32
        };
        let forward = orientation * Vec3::NEG_Z;
        let right = orientation * Vec3::X;
        let offset = forward * axis(KeyCode::KeyW, KeyCode::KeyS)
            + right * axis(KeyCode::KeyD, KeyCode::KeyA);

        Pose::new(last.position + offset * self.speed, orientation, ())
    }
}

/// Fill a whole target with one color and depth.
pub fn fill_target(target: &SoftwareTarget, color: [u8; 4], depth: f32) {
    let mut buffers = target.write();
    let extent = buffers.extent();
    for y in 0..extent.height {
        for x in 0..extent.width {
            buffers.write(x, y, color, depth);
        }
    }
}
