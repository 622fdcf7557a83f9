//! Camera model and the scripted head motion that drives it.

use glam::{Quat, Vec3};
use reproj_core::Pose;
use reproj_engine::{PoseDelta, PoseFunction};
use reproj_input::{HostInput, KeyCode, KeyTimes};

/// Mouse sensitivity for camera rotation (radians per pixel).
const MOUSE_SENSITIVITY: f32 = 0.002;
/// Walking speed (units per second of held key).
const MOVE_SPEED: f32 = 1.5;
/// Eye height above the floor.
const EYE_HEIGHT: f32 = 1.0;

/// First-person camera: mouse look plus WASD walking on the floor plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkCamera;

impl PoseFunction<()> for WalkCamera {
    fn compute(&self, last: &Pose, delta: PoseDelta, keys: &dyn KeyTimes) -> Pose {
        let yaw = Quat::from_rotation_y(-delta.dx as f32 * MOUSE_SENSITIVITY);
        let pitch = Quat::from_rotation_x(-delta.dy as f32 * MOUSE_SENSITIVITY);
        let orientation = yaw * last.orientation * pitch;

        // Walk along the floor regardless of pitch.
        let forward = (orientation * Vec3::NEG_Z).with_y(0.0).normalize_or_zero();
        let right = (orientation * Vec3::X).with_y(0.0).normalize_or_zero();
        let held = |key| keys.held_time(key) as f32;
        let offset = forward * (held(KeyCode::KeyW) - held(KeyCode::KeyS))
            + right * (held(KeyCode::KeyD) - held(KeyCode::KeyA));

        let mut position = last.position + offset * MOVE_SPEED;
        position.y = EYE_HEIGHT;
        Pose::new(position, orientation, ())
    }
}

/// Starting pose of the demo camera.
pub fn start_pose() -> Pose {
    Pose::new(Vec3::new(0.0, EYE_HEIGHT, 2.0), Quat::IDENTITY, ())
}

/// Scripted input for tick `tick`: a slow head sway with bursts of walking.
pub fn drive(input: &mut HostInput, tick: u64, now: f64) {
    let sway = (now * 0.8).sin() * 220.0;
    let nod = (now * 1.3).sin() * 40.0;
    input.set_cursor_position(sway, nod);

    match tick % 240 {
        60 => input.press(KeyCode::KeyW, now),
        120 => {
            input.release(KeyCode::KeyW);
            input.press(KeyCode::KeyD, now);
        }
        150 => {
            input.release(KeyCode::KeyD);
            input.press(KeyCode::KeyS, now);
        }
        210 => input.release(KeyCode::KeyS),
        _ => {}
    }
}
