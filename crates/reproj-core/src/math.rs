//! Projection and warp-quad math.

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Perspective projection the application renders with.
///
/// The reprojection tick needs the same parameters to rebuild the frustum a
/// frame was rendered for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Near clipping plane distance
    pub near: f32,
    /// Far clipping plane distance
    pub far: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
            fov_y: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
        }
    }
}

impl Projection {
    /// Create a validated projection.
    pub fn new(near: f32, far: f32, fov_y: f32, aspect: f32) -> Result<Self> {
        if !(near > 0.0 && far > near) {
            return Err(Error::InvalidArgument(format!(
                "clip planes must satisfy 0 < near < far (near={near}, far={far})"
            )));
        }
        if !(fov_y > 0.0 && fov_y < std::f32::consts::PI) {
            return Err(Error::InvalidArgument(format!(
                "vertical field of view must lie in (0, pi), got {fov_y}"
            )));
        }
        if !(aspect > 0.0 && aspect.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "aspect ratio must be positive, got {aspect}"
            )));
        }
        Ok(Self {
            near,
            far,
            fov_y,
            aspect,
        })
    }

    /// Projection matrix matching the application's renders (depth 0..1).
    pub fn app_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Projection used when presenting warped layers.
    ///
    /// The far plane is doubled so a quad placed exactly at `far` survives
    /// clipping after the view rotates.
    pub fn display_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far * 2.0)
    }

    /// Half width and half height of a frustum slice at `depth`.
    pub fn half_extents(&self, fov_y: f32, depth: f32) -> Vec2 {
        let half_height = depth * (fov_y * 0.5).tan();
        Vec2::new(half_height * self.aspect, half_height)
    }

    /// Model matrix of a layer quad.
    ///
    /// The unit quad (corners at +-1, z = 0) is pushed to the far plane and
    /// scaled to fill a frustum of `fov_y`, then placed at `position` facing
    /// along `rotation`.
    pub fn layer_quad_model(&self, fov_y: f32, position: Vec3, rotation: Quat) -> Mat4 {
        let extents = self.half_extents(fov_y, self.far);
        Mat4::from_rotation_translation(rotation, position)
            * Mat4::from_translation(Vec3::new(0.0, 0.0, -self.far))
            * Mat4::from_scale(Vec3::new(extents.x, extents.y, 1.0))
    }
}

/// Ray for per-pixel warp evaluation.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (not necessarily normalized)
    pub direction: Vec3,
}

/// Where a ray crossed a layer quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadHit {
    /// Ray parameter of the hit
    pub t: f32,
    /// Hit position in world space
    pub point: Vec3,
    /// Texture coordinate, origin at the top-left texel
    pub uv: Vec2,
}

impl Ray {
    /// Create a new ray
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray through a normalized-device-coordinate position, running from the
    /// near plane to the far plane of `inverse_view_projection`.
    #[inline]
    pub fn from_ndc(inverse_view_projection: Mat4, ndc: Vec2) -> Self {
        let near = inverse_view_projection.project_point3(ndc.extend(0.0));
        let far = inverse_view_projection.project_point3(ndc.extend(1.0));
        Self::new(near, far - near)
    }

    /// Get a point along the ray at parameter t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform ray by a matrix
    #[inline]
    pub fn transform(&self, matrix: Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    /// Intersect with the unit layer quad described by `inverse_model`.
    pub fn intersect_unit_quad(&self, inverse_model: Mat4) -> Option<QuadHit> {
        let local = self.transform(inverse_model);
        if local.direction.z.abs() <= f32::EPSILON {
            return None;
        }

        let t = -local.origin.z / local.direction.z;
        if !(t >= 0.0) {
            return None;
        }

        let hit = local.at(t);
        if hit.x.abs() > 1.0 || hit.y.abs() > 1.0 {
            return None;
        }

        Some(QuadHit {
            t,
            point: self.at(t),
            uv: Vec2::new((hit.x + 1.0) * 0.5, 1.0 - (hit.y + 1.0) * 0.5),
        })
    }
}
