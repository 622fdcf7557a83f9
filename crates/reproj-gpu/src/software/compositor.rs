//! CPU compositor executing the layer warp.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use parking_lot::Mutex;
use rayon::prelude::*;
use reproj_core::Ray;
use tracing::{debug, info};

use super::target::{SoftwareTarget, TargetBuffers};
use crate::compositor::{Compositor, LayerDraw};
use crate::device::Extent2D;
use crate::error::{GpuError, Result};

/// Receives every presented frame.
///
/// Shared with whoever needs to look at the display output (screenshots,
/// tests) while the display thread keeps composing.
#[derive(Debug, Default)]
pub struct PresentSink {
    latest: Mutex<Option<RgbaImage>>,
    presented: AtomicU64,
}

impl PresentSink {
    /// Number of presented frames.
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Acquire)
    }

    /// Copy of the most recent frame.
    pub fn latest(&self) -> Option<RgbaImage> {
        self.latest.lock().clone()
    }

    /// Write the most recent frame as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let latest = self.latest.lock();
        let frame = latest
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("no frame has been presented".to_string()))?;
        frame
            .save(path)
            .map_err(|e| GpuError::Other(format!("failed to save {}: {e}", path.display())))?;
        info!("Screenshot saved to {}", path.display());
        Ok(())
    }

    fn store(&self, frame: &RgbaImage) {
        let mut latest = self.latest.lock();
        match latest.as_mut() {
            Some(existing) if existing.dimensions() == frame.dimensions() => {
                existing.copy_from_slice(frame);
            }
            _ => *latest = Some(frame.clone()),
        }
        self.presented.fetch_add(1, Ordering::Release);
    }
}

/// Depth ray-march parameters for one layer draw.
struct ParallaxMarch {
    frame_view_projection: Mat4,
    camera: Vec3,
    steps: u32,
}

impl ParallaxMarch {
    /// Walk from the camera towards `point` and return the texture
    /// coordinate of the first sample that lies behind the stored depth.
    fn find(&self, source: &TargetBuffers, point: Vec3) -> Option<Vec2> {
        let step = 1.0 / self.steps as f32;
        for i in 1..=self.steps {
            let sample = self.camera.lerp(point, i as f32 * step);
            let clip = self.frame_view_projection * sample.extend(1.0);
            if clip.w <= 0.0 {
                continue;
            }
            let ndc = clip.truncate() / clip.w;
            if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
                continue;
            }
            let uv = Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5);
            if ndc.z >= source.sample_depth(uv)? {
                return Some(uv);
            }
        }
        None
    }
}

/// Source-over blend of `src` onto `dst`. Fully transparent texels are skipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(dst: &mut [u8], src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => dst.copy_from_slice(&src),
        alpha => {
            let a = f32::from(alpha) / 255.0;
            for channel in 0..3 {
                let mixed = f32::from(src[channel]).mul_add(a, f32::from(dst[channel]) * (1.0 - a));
                dst[channel] = mixed.round() as u8;
            }
            let coverage = f32::from(dst[3]).mul_add(1.0 - a, f32::from(alpha));
            dst[3] = coverage.round().min(255.0) as u8;
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_rgba8(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Software display surface.
pub struct SoftwareCompositor {
    framebuffer: RgbaImage,
    quad_ready: bool,
    parallax_ready: bool,
    parallax_supported: bool,
    sink: Arc<PresentSink>,
}

impl SoftwareCompositor {
    /// Create a display surface of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: RgbaImage::new(width, height),
            quad_ready: false,
            parallax_ready: false,
            parallax_supported: true,
            sink: Arc::new(PresentSink::default()),
        }
    }

    /// Make [`prepare_parallax`](Compositor::prepare_parallax) fail, as a
    /// backend without depth sampling would.
    #[must_use]
    pub const fn without_parallax(mut self) -> Self {
        self.parallax_supported = false;
        self
    }

    /// Handle to the presented frames.
    pub fn present_sink(&self) -> Arc<PresentSink> {
        Arc::clone(&self.sink)
    }

    /// Current framebuffer contents.
    pub const fn framebuffer(&self) -> &RgbaImage {
        &self.framebuffer
    }

    /// Display surface size.
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.framebuffer.width(), self.framebuffer.height())
    }

    /// Re-specify the display surface after a framebuffer resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.framebuffer.dimensions() != (width, height) {
            debug!(width, height, "Resized display surface");
            self.framebuffer = RgbaImage::new(width, height);
        }
    }

    /// Returns `true` once the parallax pipeline is prepared.
    pub const fn parallax_ready(&self) -> bool {
        self.parallax_ready
    }
}

impl Compositor for SoftwareCompositor {
    type Target = SoftwareTarget;

    fn prepare(&mut self) -> Result<()> {
        self.quad_ready = true;
        Ok(())
    }

    fn prepare_parallax(&mut self) -> Result<()> {
        if !self.parallax_supported {
            return Err(GpuError::PipelineCreation(
                "depth sampling is not available on this surface".to_string(),
            ));
        }
        self.parallax_ready = true;
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<()> {
        let color = to_rgba8(color);
        for pixel in self.framebuffer.pixels_mut() {
            pixel.0 = color;
        }
        Ok(())
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn draw_layer(&mut self, layer: &LayerDraw<'_, SoftwareTarget>) -> Result<()> {
        if !self.quad_ready {
            return Err(GpuError::InvalidState(
                "quad pipeline has not been prepared".to_string(),
            ));
        }

        let (width, height) = self.framebuffer.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }

        let uniforms = &layer.uniforms;
        let inverse_view_projection =
            (uniforms.projection_matrix() * uniforms.view_matrix()).inverse();
        let inverse_model = uniforms.model_matrix().inverse();

        let buffers = layer.target.read();
        let source: &TargetBuffers = &buffers;
        let march = (uniforms.is_parallax() && self.parallax_ready && source.depth().is_some())
            .then(|| ParallaxMarch {
                frame_view_projection: uniforms.frame_view_projection_matrix(),
                camera: uniforms.camera(),
                steps: uniforms.parallax_steps,
            });

        let row_len = width as usize * 4;
        self.framebuffer
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                let ndc_y = 1.0 - ((y as f32 + 0.5) / height as f32) * 2.0;
                for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                    let ndc_x = ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0;
                    let ray = Ray::from_ndc(inverse_view_projection, Vec2::new(ndc_x, ndc_y));
                    let Some(hit) = ray.intersect_unit_quad(inverse_model) else {
                        continue;
                    };
                    let uv = march
                        .as_ref()
                        .and_then(|march| march.find(source, hit.point))
                        .unwrap_or(hit.uv);
                    blend(pixel, source.sample_color(uv));
                }
            });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.sink.store(&self.framebuffer);
        Ok(())
    }
}
