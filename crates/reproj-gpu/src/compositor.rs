//! Presentation seam: warped layer draws onto the display surface.

use glam::{Mat4, Vec3};

use crate::device::RenderTarget;
use crate::error::Result;

/// Per-layer warp parameters.
///
/// Laid out for direct upload as a uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WarpUniforms {
    /// Layer quad model matrix
    pub model: [[f32; 4]; 4],
    /// View matrix of the display pose
    pub view: [[f32; 4]; 4],
    /// Display projection
    pub projection: [[f32; 4]; 4],
    /// View-projection the layer content was rendered with
    pub frame_view_projection: [[f32; 4]; 4],
    /// Display camera position (w = 1)
    pub camera_position: [f32; 4],
    /// Ray-march iterations, zero disables parallax
    pub parallax_steps: u32,
    pub _padding: [u32; 3],
}

impl WarpUniforms {
    /// Uniforms for a plain (non-parallax) warp.
    #[must_use]
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            frame_view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0, 0.0, 0.0, 1.0],
            parallax_steps: 0,
            _padding: [0; 3],
        }
    }

    /// Enable the depth ray-march.
    #[must_use]
    pub fn with_parallax(mut self, frame_view_projection: Mat4, camera: Vec3, steps: u32) -> Self {
        self.frame_view_projection = frame_view_projection.to_cols_array_2d();
        self.camera_position = camera.extend(1.0).to_array();
        self.parallax_steps = steps;
        self
    }

    /// Layer quad model matrix.
    #[inline]
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// Display view matrix.
    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    /// Display projection matrix.
    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
    }

    /// Frame view-projection used for depth lookups.
    #[inline]
    #[must_use]
    pub fn frame_view_projection_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.frame_view_projection)
    }

    /// Display camera position.
    #[inline]
    #[must_use]
    pub fn camera(&self) -> Vec3 {
        Vec3::new(
            self.camera_position[0],
            self.camera_position[1],
            self.camera_position[2],
        )
    }

    /// Returns `true` if the depth ray-march is enabled.
    #[inline]
    #[must_use]
    pub const fn is_parallax(&self) -> bool {
        self.parallax_steps > 0
    }
}

/// One layer draw: a render target and how to warp it.
#[derive(Debug)]
pub struct LayerDraw<'a, T> {
    /// The swapchain image holding the layer content
    pub target: &'a T,
    /// Warp parameters
    pub uniforms: WarpUniforms,
}

/// Draws warped layers onto the display surface and presents it.
///
/// Owned and driven by the display thread only.
pub trait Compositor: Send {
    /// Render target type this compositor samples.
    type Target: RenderTarget;

    /// Create the textured-quad pipeline. Required for any drawing.
    fn prepare(&mut self) -> Result<()>;

    /// Create the parallax ray-march pipeline.
    ///
    /// Optional: on failure parallax layers are drawn with the plain warp.
    fn prepare_parallax(&mut self) -> Result<()>;

    /// Clear the display surface.
    fn clear(&mut self, color: [f32; 4]) -> Result<()>;

    /// Draw one warped layer, blending over what is already there.
    fn draw_layer(&mut self, layer: &LayerDraw<'_, Self::Target>) -> Result<()>;

    /// Make the composed surface visible.
    fn present(&mut self) -> Result<()>;
}
