//! State shared between the display loop and the application thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::DVec2;
use parking_lot::Mutex;
use reproj_core::{Pose, PoseData, PoseInfo, Projection, TimeSource};
use reproj_gpu::{GpuContext, RenderDevice, Swapchain, SwapchainDesc};
use reproj_input::InputAggregator;
use tracing::{debug, warn};

use crate::config::ReprojectionConfig;
use crate::error::Result;
use crate::frame::{FrameLayer, FrameSubmitInfo};
use crate::history::PoseHistory;
use crate::lifecycle::{Lifecycle, ShutdownHandle};
use crate::pose_fn::PoseFunction;
use crate::predict::PosePredictor;

/// Poll interval of [`AppContext::acquire_image`] while waiting for an image.
const ACQUIRE_POLL: Duration = Duration::from_millis(50);

/// Everything guarded by the frame lock.
pub(crate) struct FrameState<T, D> {
    /// Most recent submission, `None` until the first one.
    pub(crate) last_frame: Option<FrameSubmitInfo<T, D>>,
    /// Layers of replaced frames, released by the display thread once it is
    /// done drawing.
    pub(crate) retired: Vec<FrameLayer<T>>,
    /// Input sample of the most recent submission (seeded at start).
    pub(crate) anchor: PoseInfo<D>,
    /// Pose computed by the latest display tick.
    pub(crate) display_pose: Pose<D>,
    /// Input sample of the latest display tick.
    pub(crate) display_info: PoseInfo<D>,
    pub(crate) history: PoseHistory<D>,
}

impl<T, D: PoseData> FrameState<T, D> {
    fn new(seed: PoseInfo<D>, history_capacity: usize) -> Self {
        Self {
            last_frame: None,
            retired: Vec::new(),
            display_pose: seed.real_pose.clone(),
            display_info: seed.clone(),
            anchor: seed,
            history: PoseHistory::new(history_capacity),
        }
    }
}

/// Engine state reachable from both threads.
pub(crate) struct Shared<G: RenderDevice, D> {
    pub(crate) config: ReprojectionConfig,
    pub(crate) projection: Projection,
    pub(crate) predictor: PosePredictor,
    pub(crate) gpu: Arc<GpuContext<G>>,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) pose_fn: Arc<dyn PoseFunction<D>>,
    pub(crate) frame: Mutex<FrameState<G::Target, D>>,
    pub(crate) input: Arc<Mutex<InputAggregator>>,
    pub(crate) lifecycle: Arc<Lifecycle>,
    pub(crate) submitted: AtomicU64,
}

impl<G: RenderDevice, D: PoseData> Shared<G, D> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: ReprojectionConfig,
        projection: Projection,
        gpu: Arc<GpuContext<G>>,
        clock: Arc<dyn TimeSource>,
        pose_fn: Arc<dyn PoseFunction<D>>,
        input: Arc<Mutex<InputAggregator>>,
        lifecycle: Arc<Lifecycle>,
        seed: PoseInfo<D>,
    ) -> Self {
        Self {
            predictor: PosePredictor::from_config(&config),
            frame: Mutex::new(FrameState::new(seed, config.history_capacity)),
            config,
            projection,
            gpu,
            clock,
            pose_fn,
            input,
            lifecycle,
            submitted: AtomicU64::new(0),
        }
    }

    /// Hand a completed frame to the display thread.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub(crate) fn submit(&self, info: FrameSubmitInfo<G::Target, D>) -> Result<()> {
        for layer in &info.layers {
            layer.swapchain.image(layer.image_index)?;
            if !layer.swapchain.is_acquired(layer.image_index) {
                warn!(
                    index = layer.image_index,
                    "Submitted layer references an image that was not acquired"
                );
            }
        }

        self.gpu.flush()?;

        {
            let mut frame = self.frame.lock();
            if let Some(previous) = frame.last_frame.take() {
                let replaced = previous
                    .layers
                    .into_iter()
                    .filter(|layer| !info.layers.iter().any(|next| next.same_image(layer)));
                frame.retired.extend(replaced);
            }
            frame.history.push(info.pose_info.clone());
            frame.anchor = info.pose_info.clone();
            frame.last_frame = Some(info);
            // Under the frame lock, so a tick never pairs the new anchor with
            // the old key-time epoch.
            self.input.lock().reset_epoch();
        }

        let count = self.submitted.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(frame = count, "Frame submitted");
        Ok(())
    }

    /// Release the images of replaced frames.
    ///
    /// Called by the display thread after drawing, so an image is never handed
    /// back while a tick may still sample it.
    pub(crate) fn release_retired(&self) -> Result<()> {
        let retired = {
            let mut frame = self.frame.lock();
            let mut retired = std::mem::take(&mut frame.retired);
            if let Some(current) = frame.last_frame.as_ref() {
                retired.retain(|layer| !current.layers.iter().any(|next| next.same_image(layer)));
            }
            retired
        };
        release_layers(&retired)
    }

    /// Release every image the display thread still holds.
    ///
    /// Used at shutdown so an application blocked in `acquire_image` wakes up.
    pub(crate) fn retire_frame(&self) -> Result<()> {
        let retired = {
            let mut frame = self.frame.lock();
            let mut retired = std::mem::take(&mut frame.retired);
            if let Some(last) = frame.last_frame.take() {
                retired.extend(last.layers);
            }
            retired
        };
        release_layers(&retired)
    }
}

fn release_layers<T: reproj_gpu::RenderTarget>(layers: &[FrameLayer<T>]) -> Result<()> {
    for layer in layers {
        layer.swapchain.release_image(layer.image_index)?;
    }
    Ok(())
}

/// The application thread's handle to the engine.
pub struct AppContext<G: RenderDevice, D = ()> {
    shared: Arc<Shared<G, D>>,
}

impl<G: RenderDevice, D> Clone for AppContext<G, D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: RenderDevice, D: PoseData> AppContext<G, D> {
    pub(crate) const fn new(shared: Arc<Shared<G, D>>) -> Self {
        Self { shared }
    }

    /// The pose of the latest display tick and the input it was computed from.
    pub fn camera_pose(&self) -> (Pose<D>, PoseInfo<D>) {
        let frame = self.shared.frame.lock();
        (frame.display_pose.clone(), frame.display_info.clone())
    }

    /// Estimated time at which the next submitted frame will be displayed.
    pub fn predicted_display_time(&self) -> f64 {
        let frame = self.shared.frame.lock();
        self.shared.predictor.display_time(&frame.history)
    }

    /// Pose extrapolated to `target_time`, for rendering.
    ///
    /// Advisory only: nothing is stored. The returned [`PoseInfo`] is the
    /// latest real input sample; submit it alongside the predicted pose.
    pub fn predicted_camera_pose(&self, target_time: f64) -> (Pose<D>, PoseInfo<D>) {
        let (pose, info, anchor_mouse) = {
            let frame = self.shared.frame.lock();
            (
                frame.display_pose.clone(),
                frame.display_info.clone(),
                frame.anchor.mouse,
            )
        };
        let dt = self
            .shared
            .predictor
            .time_step(target_time, self.shared.clock.now());
        let (keys, captured) = {
            let input = self.shared.input.lock();
            (input.predicted_key_times(dt), input.is_captured())
        };
        self.shared.predictor.predict(
            self.shared.pose_fn.as_ref(),
            (&pose, &info),
            anchor_mouse,
            captured,
            &keys,
            dt,
        )
    }

    /// Hand a completed frame to the engine.
    ///
    /// Waits for outstanding rendering, records its input sample and starts a
    /// new key-time epoch. Images of the replaced frame that this one does not
    /// reuse are released after the display thread's next draw.
    pub fn submit_frame(&self, info: FrameSubmitInfo<G::Target, D>) -> Result<()> {
        self.shared.submit(info)
    }

    /// Allocate a swapchain.
    pub fn create_swapchain(&self, desc: SwapchainDesc) -> Result<Arc<Swapchain<G::Target>>> {
        Ok(Arc::new(Swapchain::new(&*self.shared.gpu, desc)?))
    }

    /// Acquire the next image of `swapchain`, giving up once the engine is
    /// closing.
    pub fn acquire_image(&self, swapchain: &Swapchain<G::Target>) -> Option<usize> {
        loop {
            if self.should_close() {
                return swapchain.try_acquire_image();
            }
            if let Some(index) = swapchain.acquire_image_timeout(ACQUIRE_POLL) {
                return Some(index);
            }
        }
    }

    /// Forward mouse motion to pose computation.
    pub fn capture_cursor(&self) {
        self.shared.input.lock().capture_cursor();
    }

    /// Stop forwarding mouse motion.
    pub fn release_cursor(&self) {
        self.shared.input.lock().release_cursor();
    }

    /// Returns `true` once the engine is shutting down.
    pub fn should_close(&self) -> bool {
        self.shared.lifecycle.is_close_requested()
    }

    /// Request termination. Return from the entry point afterwards.
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// A handle that can stop the engine from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.shared.lifecycle))
    }

    /// Current engine time in seconds.
    pub fn now(&self) -> f64 {
        self.shared.clock.now()
    }

    /// Projection the application should render with.
    pub fn projection(&self) -> Projection {
        self.shared.projection
    }

    /// Engine configuration.
    pub fn config(&self) -> &ReprojectionConfig {
        &self.shared.config
    }

    /// Number of frames submitted so far.
    pub fn submitted_frames(&self) -> u64 {
        self.shared.submitted.load(Ordering::Acquire)
    }

    /// Absolute cursor position of the latest display tick.
    pub fn cursor_position(&self) -> DVec2 {
        self.shared.frame.lock().display_info.mouse
    }
}
