//! Engine entry points and the display loop.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use reproj_core::{Error, MonotonicClock, Pose, PoseData, PoseInfo, Projection, TimeSource};
use reproj_gpu::{Compositor, GpuContext, RenderDevice, Swapchain, SwapchainDesc};
use reproj_input::InputAggregator;
use tracing::{error, info, warn};

use crate::config::ReprojectionConfig;
use crate::context::{AppContext, Shared};
use crate::error::{ReprojectionError, Result};
use crate::host::{DisplayHost, SharedContext};
use crate::lifecycle::{CloseOnDrop, Lifecycle, ShutdownHandle};
use crate::pose_fn::PoseFunction;
use crate::tick::{tick, TickClock};
use crate::warp::Warp;

/// Target type of a host's device.
pub type HostTarget<H> = <<H as DisplayHost>::Device as RenderDevice>::Target;

/// Counters collected by a finished display loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReprojectionStats {
    /// Display ticks run
    pub ticks: u64,
    /// Frames submitted by the application
    pub submitted_frames: u64,
    /// Seconds between the first and the last tick
    pub duration: f64,
}

impl ReprojectionStats {
    /// Display ticks per submitted frame.
    #[must_use]
    pub fn ticks_per_frame(&self) -> f64 {
        if self.submitted_frames == 0 {
            return 0.0;
        }
        self.ticks as f64 / self.submitted_frames as f64
    }

    fn log(&self) {
        info!("Reprojection statistics:");
        info!("  Display ticks: {}", self.ticks);
        info!("  Submitted frames: {}", self.submitted_frames);
        info!("  Ticks per frame: {:.2}", self.ticks_per_frame());
        if self.duration > 0.0 {
            info!("  Avg tick rate: {:.1} Hz", self.ticks as f64 / self.duration);
            info!(
                "  Avg frame rate: {:.1} Hz",
                self.submitted_frames as f64 / self.duration
            );
        }
    }
}

/// The reprojection engine.
///
/// Lives on the thread that owns the display. Configure it, then call
/// [`start_reprojection`](Self::start_reprojection), which turns the calling
/// thread into the display loop and runs the application on a second thread.
pub struct Reprojection<H: DisplayHost, D: PoseData = ()> {
    host: H,
    config: ReprojectionConfig,
    clock: Arc<dyn TimeSource>,
    gpu: Arc<GpuContext<H::Device>>,
    input: Arc<Mutex<InputAggregator>>,
    projection: Option<Projection>,
    pose_fn: Option<Arc<dyn PoseFunction<D>>>,
    lifecycle: Arc<Lifecycle>,
    stats: Option<ReprojectionStats>,
}

impl<H: DisplayHost, D: PoseData> Reprojection<H, D> {
    /// Create an engine for `host`. Nothing runs until started.
    pub fn new(host: H, config: ReprojectionConfig) -> Self {
        let gpu = Arc::new(GpuContext::new(host.device()));
        Self {
            host,
            config,
            clock: Arc::new(MonotonicClock::new()),
            gpu,
            input: Arc::new(Mutex::new(InputAggregator::new())),
            projection: None,
            pose_fn: None,
            lifecycle: Arc::new(Lifecycle::new()),
            stats: None,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Bind the engine to the host's current rendering context.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.host.has_current_context() {
            error!("Cannot initialize reprojection: no rendering context is current");
            return Err(Error::NoContext.into());
        }
        self.config.validate()?;
        self.gpu.initialize();
        Ok(())
    }

    /// Register the function mapping input to camera poses.
    pub fn register_pose_function(&mut self, pose_fn: impl PoseFunction<D> + 'static) {
        self.pose_fn = Some(Arc::new(pose_fn));
    }

    /// Set the projection the application renders with.
    pub fn update_projection(&mut self, near: f32, far: f32, fov_y: f32, aspect: f32) -> Result<()> {
        let projection = Projection::new(near, far, fov_y, aspect)?;
        self.projection = Some(projection);
        Ok(())
    }

    /// Allocate a swapchain. Requires [`initialize`](Self::initialize).
    pub fn create_swapchain(&self, desc: SwapchainDesc) -> Result<Arc<Swapchain<HostTarget<H>>>> {
        Ok(Arc::new(Swapchain::new(&*self.gpu, desc)?))
    }

    /// Forward mouse motion to pose computation.
    pub fn capture_cursor(&self) {
        self.input.lock().capture_cursor();
    }

    /// Stop forwarding mouse motion.
    pub fn release_cursor(&self) {
        self.input.lock().release_cursor();
    }

    /// A handle that can stop the engine from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.lifecycle))
    }

    /// Engine configuration.
    pub const fn config(&self) -> &ReprojectionConfig {
        &self.config
    }

    /// The display host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// The display host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Statistics of the finished display loop.
    pub const fn stats(&self) -> Option<ReprojectionStats> {
        self.stats
    }

    /// Run the display loop on the calling thread until shutdown.
    ///
    /// `app` runs on a new thread against a hidden context that shares
    /// resources with the display. When it returns the display closes; when
    /// the display closes [`AppContext::should_close`] turns `true` and the
    /// application is expected to return promptly.
    pub fn start_reprojection<F>(&mut self, app: F) -> Result<()>
    where
        F: FnOnce(AppContext<H::Device, D>) -> anyhow::Result<()> + Send + 'static,
    {
        let Some(pose_fn) = self.pose_fn.clone() else {
            error!("No pose function registered, not starting reprojection");
            return Err(Error::MissingPoseFunction.into());
        };
        if !self.gpu.is_initialized() {
            error!("Reprojection started before initialize");
            return Err(Error::NotInitialized.into());
        }
        if self.lifecycle.state() != crate::lifecycle::RunState::Idle {
            return Err(Error::AlreadyStarted.into());
        }
        let projection = self.projection.unwrap_or_else(|| {
            warn!("No projection set, using defaults");
            Projection::default()
        });

        self.host.compositor().prepare()?;
        let parallax_available = match self.host.compositor().prepare_parallax() {
            Ok(()) => true,
            Err(e) => {
                error!("Parallax pipeline unavailable, using the plain warp: {e}");
                false
            }
        };
        let warp = Warp::new(projection, &self.config).with_parallax_available(parallax_available);
        let render_context = self.host.create_shared_context()?;

        let now = self.clock.now();
        let seed = PoseInfo::new(self.host.cursor_position(), now, Pose::default());
        let shared = Arc::new(Shared::new(
            self.config.clone(),
            projection,
            Arc::clone(&self.gpu),
            Arc::clone(&self.clock),
            pose_fn,
            Arc::clone(&self.input),
            Arc::clone(&self.lifecycle),
            seed,
        ));

        if !self.lifecycle.begin() {
            return Err(Error::AlreadyStarted.into());
        }
        info!("Starting reprojection");

        let app_thread = match spawn_app_thread(&self.config, &shared, render_context, app) {
            Ok(handle) => handle,
            Err(e) => {
                self.lifecycle.finish();
                return Err(e);
            }
        };

        let mut clock = TickClock::new(now);
        let pacing = self.config.target_tick_interval();
        while !(self.lifecycle.is_close_requested() || self.host.should_close()) {
            let tick_start = Instant::now();
            if let Err(e) = tick(&shared, &mut self.host, &warp, &mut clock) {
                error!("Reprojection tick failed: {e}");
            }
            if let Some(interval) = pacing {
                let elapsed = tick_start.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }

        info!("Display loop finished, stopping application thread");
        self.lifecycle.request_close();
        self.host.request_close();
        if let Err(e) = shared.retire_frame() {
            error!("Failed to release displayed images: {e}");
        }

        let joined = app_thread.join();
        self.lifecycle.finish();

        let stats = ReprojectionStats {
            ticks: clock.ticks(),
            submitted_frames: shared.submitted.load(std::sync::atomic::Ordering::Acquire),
            duration: clock.elapsed(),
        };
        stats.log();
        self.stats = Some(stats);

        match joined {
            Ok(Ok(())) => {
                info!("Application thread joined");
                Ok(())
            }
            Ok(Err(e)) => Err(ReprojectionError::AppThread(format!("{e:#}"))),
            Err(_) => Err(ReprojectionError::AppThread(
                "application thread panicked".to_string(),
            )),
        }
    }
}

fn spawn_app_thread<G, D, C, F>(
    config: &ReprojectionConfig,
    shared: &Arc<Shared<G, D>>,
    mut render_context: C,
    app: F,
) -> Result<thread::JoinHandle<anyhow::Result<()>>>
where
    G: RenderDevice,
    D: PoseData,
    C: SharedContext,
    F: FnOnce(AppContext<G, D>) -> anyhow::Result<()> + Send + 'static,
{
    let context = AppContext::new(Arc::clone(shared));
    let lifecycle = Arc::clone(&shared.lifecycle);
    let handle = thread::Builder::new()
        .name(config.app_thread_name.clone())
        .spawn(move || {
            let _close = CloseOnDrop(Arc::clone(&lifecycle));
            lifecycle.set_app_thread(thread::current().id());
            info!("Application thread started");

            let result = match render_context.make_current() {
                Ok(()) => app(context),
                Err(e) => Err(e.into()),
            };
            render_context.release();

            if let Err(e) = &result {
                error!("Application thread failed: {e:#}");
            }
            result
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use std::cell::OnceCell;
    use std::rc::Rc;

    use reproj_input::KeyTimes;

    use super::*;
    use crate::frame::FrameSubmitInfo;
    use crate::headless::HeadlessHost;
    use crate::pose_fn::PoseDelta;
    use crate::FrameLayer;

    fn identity(pose: &Pose, _delta: PoseDelta, _keys: &dyn KeyTimes) -> Pose {
        pose.clone()
    }

    fn engine(host: HeadlessHost) -> Reprojection<HeadlessHost> {
        Reprojection::new(host, ReprojectionConfig::default())
    }

    #[test]
    fn initialize_requires_current_context() {
        let mut engine = engine(HeadlessHost::new(8, 8).without_context());
        let err = engine.initialize().unwrap_err();
        assert!(matches!(err, ReprojectionError::Core(Error::NoContext)));
    }

    #[test]
    fn start_requires_pose_function() {
        let mut engine = engine(HeadlessHost::new(8, 8));
        engine.initialize().unwrap();
        let err = engine.start_reprojection(|_| Ok(())).unwrap_err();
        assert!(matches!(err, ReprojectionError::Core(Error::MissingPoseFunction)));
    }

    #[test]
    fn start_requires_initialize() {
        let mut engine = engine(HeadlessHost::new(8, 8));
        engine.register_pose_function(identity);
        let err = engine.start_reprojection(|_| Ok(())).unwrap_err();
        assert!(matches!(err, ReprojectionError::Core(Error::NotInitialized)));
    }

    #[test]
    fn swapchain_requires_initialize() {
        let engine = engine(HeadlessHost::new(8, 8));
        assert!(engine.create_swapchain(SwapchainDesc::new(8, 8, 2)).is_err());
    }

    #[test]
    fn invalid_projection_is_rejected() {
        let mut engine = engine(HeadlessHost::new(8, 8));
        assert!(engine.update_projection(1.0, 0.5, 1.0, 1.0).is_err());
        assert!(engine.update_projection(0.1, 100.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn app_return_stops_display_loop() {
        let mut engine = engine(HeadlessHost::new(16, 16).with_max_ticks(1_000_000));
        engine.initialize().unwrap();
        engine.register_pose_function(identity);

        engine
            .start_reprojection(|ctx| {
                let swapchain = ctx.create_swapchain(SwapchainDesc::new(16, 16, 2))?;
                for _ in 0..3 {
                    let Some(index) = ctx.acquire_image(&swapchain) else {
                        break;
                    };
                    let (pose, info) = ctx.camera_pose();
                    let layer = FrameLayer::new(Arc::clone(&swapchain), index, 1.0);
                    ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;
                }
                Ok(())
            })
            .unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.submitted_frames, 3);
        assert!(stats.ticks >= 1);
        assert!(engine.host().should_close());
        assert!(engine.shutdown_handle().is_close_requested());
    }

    #[test]
    fn app_error_is_reported() {
        let mut engine = engine(HeadlessHost::new(8, 8).with_max_ticks(1_000_000));
        engine.initialize().unwrap();
        engine.register_pose_function(identity);

        let err = engine
            .start_reprojection(|_| Err(anyhow::anyhow!("scene failed to load")))
            .unwrap_err();
        assert!(matches!(err, ReprojectionError::AppThread(ref msg) if msg.contains("scene failed")));
    }

    #[test]
    fn display_close_stops_app() {
        let mut engine = engine(HeadlessHost::new(8, 8).with_max_ticks(5));
        engine.initialize().unwrap();
        engine.register_pose_function(identity);

        engine
            .start_reprojection(|ctx| {
                while !ctx.should_close() {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(engine.stats().unwrap().ticks, 5);
        assert_eq!(engine.host().ticks(), 5);
    }

    #[test]
    fn shutdown_from_host_callback_stops_loop() {
        let slot: Rc<OnceCell<ShutdownHandle>> = Rc::new(OnceCell::new());
        let script_slot = Rc::clone(&slot);
        let host = HeadlessHost::new(8, 8)
            .with_max_ticks(1_000_000)
            .with_input_script(move |_, tick, _| {
                if tick == 3 {
                    if let Some(handle) = script_slot.get() {
                        handle.shutdown();
                    }
                }
            });
        let mut engine = engine(host);
        engine.initialize().unwrap();
        engine.register_pose_function(identity);
        slot.set(engine.shutdown_handle()).unwrap();

        engine
            .start_reprojection(|ctx| {
                while !ctx.should_close() {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(engine.stats().unwrap().ticks, 3);
        assert_eq!(
            engine.shutdown_handle().state(),
            crate::lifecycle::RunState::Stopped
        );
    }

    #[test]
    fn engine_runs_once() {
        let mut engine = engine(HeadlessHost::new(8, 8).with_max_ticks(1_000_000));
        engine.initialize().unwrap();
        engine.register_pose_function(identity);
        engine.start_reprojection(|_| Ok(())).unwrap();
        let err = engine.start_reprojection(|_| Ok(())).unwrap_err();
        assert!(matches!(err, ReprojectionError::Core(Error::AlreadyStarted)));
    }
}
