//! CPU ray-traced test scene: a checkerboard floor with a few spheres.

use glam::{Mat4, Vec2, Vec3};
use rayon::prelude::*;
use reproj_core::{Pose, Projection, Ray};
use reproj_gpu::SoftwareTarget;

const SKY_TOP: Vec3 = Vec3::new(0.35, 0.55, 0.9);
const SKY_HORIZON: Vec3 = Vec3::new(0.85, 0.9, 1.0);
const SUN: Vec3 = Vec3::new(0.4, 0.8, 0.3);
const FAR_DEPTH: f32 = 1.0;

struct Sphere {
    center: Vec3,
    radius: f32,
    color: Vec3,
}

/// Static scene rendered by the application thread.
pub struct Scene {
    spheres: Vec<Sphere>,
    checker_size: f32,
}

impl Default for Scene {
    fn default() -> Self {
        let sphere = |x, y, z, radius, color| Sphere {
            center: Vec3::new(x, y, z),
            radius,
            color,
        };
        Self {
            spheres: vec![
                sphere(0.0, 1.0, -6.0, 1.0, Vec3::new(0.9, 0.25, 0.2)),
                sphere(-2.5, 0.6, -4.0, 0.6, Vec3::new(0.2, 0.8, 0.3)),
                sphere(2.2, 0.8, -3.0, 0.8, Vec3::new(0.25, 0.35, 0.9)),
                sphere(1.0, 0.3, -1.8, 0.3, Vec3::new(0.95, 0.85, 0.2)),
            ],
            checker_size: 1.0,
        }
    }
}

impl Scene {
    /// Render the view from `pose` into the color and depth planes of `target`.
    pub fn render(&self, pose: &Pose, projection: &Projection, target: &SoftwareTarget) {
        let mut buffers = target.write();
        let extent = buffers.extent();
        let view_projection = projection.app_matrix() * pose.view_matrix();
        let inverse = view_projection.inverse();
        let (width, height) = (extent.width, extent.height);

        let texels: Vec<([u8; 4], f32)> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| {
                    let ndc = Vec2::new(
                        ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0,
                        1.0 - ((y as f32 + 0.5) / height as f32) * 2.0,
                    );
                    self.shade(Ray::from_ndc(inverse, ndc), view_projection)
                })
            })
            .collect();

        for (i, (color, depth)) in texels.into_iter().enumerate() {
            let i = i as u32;
            buffers.write(i % width, i / width, color, depth);
        }
    }

    fn shade(&self, ray: Ray, view_projection: Mat4) -> ([u8; 4], f32) {
        let direction = ray.direction.normalize();
        let ray = Ray::new(ray.origin, direction);

        let mut nearest: Option<(f32, Vec3, Vec3)> = None;
        for sphere in &self.spheres {
            if let Some(t) = intersect_sphere(&ray, sphere) {
                if nearest.map_or(true, |(best, _, _)| t < best) {
                    let normal = (ray.at(t) - sphere.center).normalize();
                    nearest = Some((t, normal, sphere.color));
                }
            }
        }
        if direction.y < -1e-4 {
            let t = -ray.origin.y / direction.y;
            if t > 0.0 && nearest.map_or(true, |(best, _, _)| t < best) {
                nearest = Some((t, Vec3::Y, self.checker(ray.at(t))));
            }
        }

        let Some((t, normal, albedo)) = nearest else {
            let sky = SKY_HORIZON.lerp(SKY_TOP, direction.y.clamp(0.0, 1.0));
            return (to_rgba8(sky), FAR_DEPTH);
        };

        let light = normal.dot(SUN.normalize()).max(0.0).mul_add(0.8, 0.2);
        let depth = view_projection.project_point3(ray.at(t)).z.clamp(0.0, FAR_DEPTH);
        (to_rgba8(albedo * light), depth)
    }

    fn checker(&self, point: Vec3) -> Vec3 {
        let cell = (point.x / self.checker_size).floor() + (point.z / self.checker_size).floor();
        if cell.rem_euclid(2.0) < 1.0 {
            Vec3::splat(0.85)
        } else {
            Vec3::splat(0.25)
        }
    }
}

fn intersect_sphere(ray: &Ray, sphere: &Sphere) -> Option<f32> {
    let oc = ray.origin - sphere.center;
    let b = oc.dot(ray.direction);
    let c = sphere.radius.mul_add(-sphere.radius, oc.length_squared());
    let discriminant = b.mul_add(b, -c);
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    [-b - root, -b + root].into_iter().find(|t| *t > 0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_rgba8(color: Vec3) -> [u8; 4] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Draw the camera-locked overlay: a crosshair and a tick counter bar on a
/// transparent background.
pub fn draw_hud(target: &SoftwareTarget, frame: u64) {
    let mut buffers = target.write();
    buffers.clear([0, 0, 0, 0]);
    let extent = buffers.extent();
    let (cx, cy) = (extent.width / 2, extent.height / 2);

    for offset in 0..12 {
        for (x, y) in [
            (cx + offset, cy),
            (cx.saturating_sub(offset), cy),
            (cx, cy + offset),
            (cx, cy.saturating_sub(offset)),
        ] {
            if x < extent.width && y < extent.height {
                buffers.write(x, y, [255, 255, 255, 200], 0.0);
            }
        }
    }

    // Progress bar along the bottom edge, one segment per rendered frame.
    let bar = (frame % 64) as u32 * extent.width / 64;
    let bottom = extent.height.saturating_sub(4);
    for y in bottom..extent.height {
        for x in 0..bar {
            buffers.write(x, y, [255, 200, 40, 160], 0.0);
        }
    }
}
