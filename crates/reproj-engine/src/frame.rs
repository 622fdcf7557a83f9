//! Frame submission types.

use std::sync::Arc;

use bitflags::bitflags;
use reproj_core::{Pose, PoseInfo};
use reproj_gpu::Swapchain;

bitflags! {
    /// How a layer is warped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameLayerFlags: u32 {
        /// Correct for camera translation with the layer's depth buffer.
        const PARALLAX_ENABLED = 0b0000_0001;
        /// Keep the layer fixed to the current view orientation (HUD content).
        const CAMERA_LOCKED    = 0b0000_0010;
    }
}

/// One drawable surface of a submitted frame.
///
/// The layer borrows one image of a swapchain from submission until the next
/// submission replaces it, at which point the engine releases the image.
pub struct FrameLayer<T> {
    /// Vertical field of view the layer was rendered with (radians)
    pub fov_y: f32,
    /// Warp flags
    pub flags: FrameLayerFlags,
    /// Swapchain owning the image
    pub swapchain: Arc<Swapchain<T>>,
    /// Index of the image holding the layer content
    pub image_index: usize,
}

impl<T> FrameLayer<T> {
    /// Create a plain layer.
    pub fn new(swapchain: Arc<Swapchain<T>>, image_index: usize, fov_y: f32) -> Self {
        Self {
            fov_y,
            flags: FrameLayerFlags::empty(),
            swapchain,
            image_index,
        }
    }

    /// Set the warp flags.
    #[must_use]
    pub fn with_flags(mut self, flags: FrameLayerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns `true` if both layers reference the same image.
    pub fn same_image(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.swapchain, &other.swapchain) && self.image_index == other.image_index
    }
}

impl<T> Clone for FrameLayer<T> {
    fn clone(&self) -> Self {
        Self {
            fov_y: self.fov_y,
            flags: self.flags,
            swapchain: Arc::clone(&self.swapchain),
            image_index: self.image_index,
        }
    }
}

impl<T> std::fmt::Debug for FrameLayer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLayer")
            .field("fov_y", &self.fov_y)
            .field("flags", &self.flags)
            .field("image_index", &self.image_index)
            .finish_non_exhaustive()
    }
}

/// A completed frame handed to the engine.
///
/// Layers are listed front to back: the first layer ends up on top.
pub struct FrameSubmitInfo<T, D = ()> {
    /// Pose the frame was rendered for
    pub pose: Pose<D>,
    /// Inputs the pose was derived from
    pub pose_info: PoseInfo<D>,
    /// Layers, front to back
    pub layers: Vec<FrameLayer<T>>,
}

impl<T, D> FrameSubmitInfo<T, D> {
    /// Create a submission without layers.
    pub const fn new(pose: Pose<D>, pose_info: PoseInfo<D>) -> Self {
        Self {
            pose,
            pose_info,
            layers: Vec::new(),
        }
    }

    /// Append a layer behind the existing ones.
    #[must_use]
    pub fn with_layer(mut self, layer: FrameLayer<T>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl<T, D: Clone> Clone for FrameSubmitInfo<T, D> {
    fn clone(&self) -> Self {
        Self {
            pose: self.pose.clone(),
            pose_info: self.pose_info.clone(),
            layers: self.layers.clone(),
        }
    }
}

impl<T, D: std::fmt::Debug> std::fmt::Debug for FrameSubmitInfo<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSubmitInfo")
            .field("pose", &self.pose)
            .field("pose_info", &self.pose_info)
            .field("layers", &self.layers)
            .finish()
    }
}
