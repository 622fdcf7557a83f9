//! Per-layer warp construction.
//!
//! A layer's image is put on a quad at the far plane of the frustum it was
//! rendered with, placed where the camera was when the frame was rendered,
//! and then viewed from the current display pose. Camera-locked layers take
//! their rotation from the display pose instead, so they never appear to move.

use glam::{Mat4, Quat};
use reproj_core::{Pose, Projection};
use reproj_gpu::WarpUniforms;

use crate::config::ReprojectionConfig;
use crate::frame::FrameLayerFlags;

/// Builds [`WarpUniforms`] for the layers of the displayed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Warp {
    projection: Projection,
    parallax_steps: u32,
    parallax_epsilon: f32,
    parallax_available: bool,
}

impl Warp {
    /// Create a warp builder.
    #[must_use]
    pub const fn new(projection: Projection, config: &ReprojectionConfig) -> Self {
        Self {
            projection,
            parallax_steps: config.parallax_steps,
            parallax_epsilon: config.parallax_epsilon,
            parallax_available: true,
        }
    }

    /// Enable or disable the parallax path (e.g. after pipeline creation failed).
    #[must_use]
    pub const fn with_parallax_available(mut self, available: bool) -> Self {
        self.parallax_available = available;
        self
    }

    /// The projection warps are built for.
    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Model matrix of a layer quad.
    pub fn layer_model<D>(
        &self,
        fov_y: f32,
        flags: FrameLayerFlags,
        frame: &Pose<D>,
        display: &Pose<D>,
    ) -> Mat4 {
        let rotation: Quat = if flags.contains(FrameLayerFlags::CAMERA_LOCKED) {
            display.orientation
        } else {
            frame.orientation
        };
        self.projection
            .layer_quad_model(fov_y, frame.position, rotation)
    }

    /// Returns `true` if a layer should be ray-marched against its depth.
    pub fn uses_parallax<D>(
        &self,
        flags: FrameLayerFlags,
        has_depth: bool,
        frame: &Pose<D>,
        display: &Pose<D>,
    ) -> bool {
        self.parallax_available
            && self.parallax_steps > 0
            && has_depth
            && flags.contains(FrameLayerFlags::PARALLAX_ENABLED)
            && !flags.contains(FrameLayerFlags::CAMERA_LOCKED)
            && display.position.distance(frame.position) > self.parallax_epsilon
    }

    /// Complete warp parameters for one layer.
    pub fn layer_uniforms<D>(
        &self,
        fov_y: f32,
        flags: FrameLayerFlags,
        has_depth: bool,
        frame: &Pose<D>,
        display: &Pose<D>,
    ) -> WarpUniforms {
        let uniforms = WarpUniforms::new(
            self.layer_model(fov_y, flags, frame, display),
            display.view_matrix(),
            self.projection.display_matrix(),
        );
        if self.uses_parallax(flags, has_depth, frame, display) {
            let frame_view_projection = self.projection.app_matrix() * frame.view_matrix();
            uniforms.with_parallax(frame_view_projection, display.position, self.parallax_steps)
        } else {
            uniforms
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn warp() -> Warp {
        Warp::new(Projection::default(), &ReprojectionConfig::default())
    }

    #[test]
    fn unchanged_pose_makes_camera_locked_match_plain() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.3), ());
        let fov = Projection::default().fov_y;
        let warp = warp();

        let plain = warp.layer_uniforms(fov, FrameLayerFlags::empty(), true, &pose, &pose);
        let locked = warp.layer_uniforms(fov, FrameLayerFlags::CAMERA_LOCKED, true, &pose, &pose);
        assert_eq!(plain, locked);
    }

    #[test]
    fn camera_locked_follows_display_orientation() {
        let frame = Pose::default();
        let display = Pose::new(Vec3::ZERO, Quat::from_rotation_y(0.5), ());
        let warp = warp();
        let fov = warp.projection().fov_y;

        let locked = warp.layer_model(fov, FrameLayerFlags::CAMERA_LOCKED, &frame, &display);
        let plain = warp.layer_model(fov, FrameLayerFlags::empty(), &frame, &display);

        // The locked quad stays centred in the display view.
        let centre = (display.view_matrix() * locked).transform_point3(Vec3::ZERO);
        assert!(centre.x.abs() < 1e-3 && centre.y.abs() < 1e-3);
        assert!(!locked.abs_diff_eq(plain, 1e-4));
    }

    #[test]
    fn parallax_needs_translation_and_depth() {
        let warp = warp();
        let frame = Pose::default();
        let moved = Pose::new(Vec3::new(0.1, 0.0, 0.0), Quat::IDENTITY, ());
        let flags = FrameLayerFlags::PARALLAX_ENABLED;

        assert!(warp.uses_parallax(flags, true, &frame, &moved));
        assert!(!warp.uses_parallax(flags, true, &frame, &frame));
        assert!(!warp.uses_parallax(flags, false, &frame, &moved));
        assert!(!warp.uses_parallax(
            flags | FrameLayerFlags::CAMERA_LOCKED,
            true,
            &frame,
            &moved
        ));
        assert!(!warp
            .with_parallax_available(false)
            .uses_parallax(flags, true, &frame, &moved));
    }

    #[test]
    fn parallax_uniforms_carry_frame_view_projection() {
        let warp = warp();
        let frame = Pose::default();
        let moved = Pose::new(Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY, ());
        let uniforms = warp.layer_uniforms(
            warp.projection().fov_y,
            FrameLayerFlags::PARALLAX_ENABLED,
            true,
            &frame,
            &moved,
        );
        assert!(uniforms.is_parallax());
        assert_eq!(uniforms.parallax_steps, 32);
        assert_eq!(uniforms.camera(), moved.position);
        assert!(uniforms
            .frame_view_projection_matrix()
            .abs_diff_eq(Projection::default().app_matrix(), 1e-6));
    }
}
