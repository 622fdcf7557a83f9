//! The per-refresh reprojection tick.

use glam::DVec2;
use reproj_core::{Pose, PoseData, PoseInfo};
use reproj_gpu::{Compositor, LayerDraw, RenderTarget};

use crate::context::Shared;
use crate::error::Result;
use crate::frame::FrameLayer;
use crate::host::DisplayHost;
use crate::pose_fn::{evaluate, PoseDelta};
use crate::warp::Warp;

/// Display-thread timing carried from tick to tick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TickClock {
    last: f64,
    started: f64,
    ticks: u64,
}

impl TickClock {
    pub(crate) const fn new(now: f64) -> Self {
        Self {
            last: now,
            started: now,
            ticks: 0,
        }
    }

    pub(crate) const fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn elapsed(&self) -> f64 {
        self.last - self.started
    }
}

/// Run one display refresh: sample input, compute the display pose, warp the
/// last submitted frame and present.
#[cfg_attr(
    feature = "profiling-tracy",
    tracing::instrument(level = "trace", skip_all)
)]
pub(crate) fn tick<H, D>(
    shared: &Shared<H::Device, D>,
    host: &mut H,
    warp: &Warp,
    clock: &mut TickClock,
) -> Result<()>
where
    H: DisplayHost,
    D: PoseData,
{
    let captured = shared.input.lock().is_captured();
    host.set_cursor_captured(captured);

    let now = shared.clock.now();
    let elapsed = (now - clock.last).max(0.0);
    clock.last = now;
    clock.ticks += 1;

    // Key times and the anchor come from one section so a submission cannot
    // land between them. Deltas are measured against the last submitted
    // frame, not the last tick.
    let cursor = host.cursor_position();
    let (held, anchor, frame) = {
        let state = shared.frame.lock();
        let mut input = shared.input.lock();
        input.sync_keyboard(host.keyboard());
        input.accumulate(elapsed);
        let frame = state
            .last_frame
            .as_ref()
            .map(|frame| (frame.pose.clone(), frame.layers.clone()));
        (input.held_times().clone(), state.anchor.clone(), frame)
    };
    let mouse = if captured {
        cursor - anchor.mouse
    } else {
        DVec2::ZERO
    };
    let delta = PoseDelta::new(mouse.x, mouse.y, (now - anchor.time).max(0.0));

    let pose = evaluate(shared.pose_fn.as_ref(), &anchor.real_pose, delta, &held);
    {
        let mut state = shared.frame.lock();
        state.display_info = PoseInfo::new(cursor, now, pose.clone());
        state.display_pose = pose.clone();
    }

    let drawn = compose(
        host.compositor(),
        shared.config.clear_color,
        warp,
        frame.as_ref().map(|(frame_pose, layers)| (frame_pose, layers.as_slice())),
        &pose,
    );
    let released = shared.release_retired();
    host.poll_events(now);
    drawn.and(released)
}

/// Clear, draw the layers back to front and present.
fn compose<C, D>(
    compositor: &mut C,
    clear_color: [f32; 4],
    warp: &Warp,
    frame: Option<(&Pose<D>, &[FrameLayer<C::Target>])>,
    display: &Pose<D>,
) -> Result<()>
where
    C: Compositor,
{
    compositor.clear(clear_color)?;
    if let Some((frame_pose, layers)) = frame {
        // The first layer is drawn last so it ends up on top.
        for layer in layers.iter().rev() {
            let target = layer.swapchain.image(layer.image_index)?;
            let uniforms = warp.layer_uniforms(
                layer.fov_y,
                layer.flags,
                target.has_depth(),
                frame_pose,
                display,
            );
            compositor.draw_layer(&LayerDraw { target, uniforms })?;
        }
    }
    compositor.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Quat, Vec3};
    use reproj_core::Projection;
    use reproj_gpu::{
        GpuContext, SoftwareCompositor, SoftwareDevice, SoftwareTarget, Swapchain, SwapchainDesc,
        WarpUniforms,
    };

    use super::*;
    use crate::config::ReprojectionConfig;
    use crate::frame::FrameLayerFlags;

    /// Records draws instead of rasterizing them.
    #[derive(Default)]
    struct Recorder {
        cleared: u32,
        draws: Vec<(usize, WarpUniforms)>,
        presented: u32,
    }

    impl Compositor for Recorder {
        type Target = SoftwareTarget;

        fn prepare(&mut self) -> reproj_gpu::Result<()> {
            Ok(())
        }

        fn prepare_parallax(&mut self) -> reproj_gpu::Result<()> {
            Ok(())
        }

        fn clear(&mut self, _color: [f32; 4]) -> reproj_gpu::Result<()> {
            self.cleared += 1;
            Ok(())
        }

        fn draw_layer(&mut self, layer: &LayerDraw<'_, SoftwareTarget>) -> reproj_gpu::Result<()> {
            let width = layer.target.extent().width as usize;
            self.draws.push((width, layer.uniforms));
            Ok(())
        }

        fn present(&mut self) -> reproj_gpu::Result<()> {
            self.presented += 1;
            Ok(())
        }
    }

    fn swapchain(width: u32) -> Arc<Swapchain<SoftwareTarget>> {
        let context = GpuContext::new(Arc::new(SoftwareDevice::new()));
        context.initialize();
        Arc::new(Swapchain::new(&context, SwapchainDesc::new(width, 4, 2)).unwrap())
    }

    #[test]
    fn layers_are_drawn_back_to_front() {
        let front = FrameLayer::new(swapchain(1), 0, 1.0);
        let back = FrameLayer::new(swapchain(2), 0, 1.0);
        let warp = Warp::new(Projection::default(), &ReprojectionConfig::default());
        let pose: Pose<()> = Pose::default();
        let mut recorder = Recorder::default();

        compose(
            &mut recorder,
            [0.0; 4],
            &warp,
            Some((&pose, &[front, back][..])),
            &pose,
        )
        .unwrap();

        let widths: Vec<_> = recorder.draws.iter().map(|(width, _)| *width).collect();
        assert_eq!(widths, vec![2, 1]);
        assert_eq!((recorder.cleared, recorder.presented), (1, 1));
    }

    #[test]
    fn no_frame_still_clears_and_presents() {
        let warp = Warp::new(Projection::default(), &ReprojectionConfig::default());
        let mut recorder = Recorder::default();
        compose::<_, ()>(&mut recorder, [0.0; 4], &warp, None, &Pose::default()).unwrap();
        assert!(recorder.draws.is_empty());
        assert_eq!((recorder.cleared, recorder.presented), (1, 1));
    }

    #[test]
    fn camera_locked_layer_uses_display_orientation() {
        let chain = swapchain(1);
        let layers = [
            FrameLayer::new(Arc::clone(&chain), 0, 1.0).with_flags(FrameLayerFlags::CAMERA_LOCKED),
            FrameLayer::new(chain, 1, 1.0),
        ];
        let warp = Warp::new(Projection::default(), &ReprojectionConfig::default());
        let frame = Pose::default();
        let display = Pose::new(Vec3::ZERO, Quat::from_rotation_x(0.4), ());
        let mut recorder = Recorder::default();

        compose(&mut recorder, [0.0; 4], &warp, Some((&frame, &layers[..])), &display).unwrap();

        let plain = recorder.draws[0].1.model_matrix();
        let locked = recorder.draws[1].1.model_matrix();
        assert!(!plain.abs_diff_eq(locked, 1e-4));
        assert_eq!(
            locked,
            warp.layer_model(1.0, FrameLayerFlags::CAMERA_LOCKED, &frame, &display)
        );
    }

    #[test]
    fn software_compositor_presents_through_compose() {
        let warp = Warp::new(Projection::default(), &ReprojectionConfig::default());
        let mut compositor = SoftwareCompositor::new(2, 2);
        compositor.prepare().unwrap();
        let sink = compositor.present_sink();
        compose::<_, ()>(&mut compositor, [1.0, 1.0, 1.0, 1.0], &warp, None, &Pose::default())
            .unwrap();
        assert_eq!(sink.presented(), 1);
        assert_eq!(sink.latest().unwrap().get_pixel(0, 0).0, [255; 4]);
    }
}
