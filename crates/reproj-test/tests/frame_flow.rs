//! Acquire and submit from the application thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, ensure};
use reproj_core::Pose;
use reproj_engine::{
    AppContext, FrameLayer, FrameSubmitInfo, HeadlessHost, PoseDelta, PoseFunction, Reprojection,
    ReprojectionConfig,
};
use reproj_gpu::{SoftwareDevice, SoftwareTarget, Swapchain, SwapchainDesc};
use reproj_input::{KeyCode, KeyTimes};
use reproj_test::{fill_target, identity_pose, wait_until, ReprojectionHarness, ScriptedInput};

fn submit(
    ctx: &AppContext<SoftwareDevice>,
    swapchain: &Arc<Swapchain<SoftwareTarget>>,
    index: usize,
) -> anyhow::Result<()> {
    let (pose, info) = ctx.camera_pose();
    let layer = FrameLayer::new(Arc::clone(swapchain), index, ctx.projection().fov_y);
    ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;
    Ok(())
}

#[test]
fn submission_releases_the_replaced_image() {
    let report = ReprojectionHarness::new(640, 480)
        .run(identity_pose, |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(640, 480, 3))?;

            let first = swapchain.try_acquire_image();
            ensure!(first == Some(0), "first acquire returned {first:?}");
            submit(&ctx, &swapchain, 0)?;

            let second = swapchain.try_acquire_image();
            ensure!(second == Some(1), "second acquire blocked or returned {second:?}");
            submit(&ctx, &swapchain, 1)?;
            // The display thread hands image 0 back after its next draw.
            wait_until(&ctx, |_| !swapchain.is_acquired(0))?;
            ensure!(swapchain.is_acquired(1), "displayed image 1 was released");

            // The ring continues with 2, then comes back to the released 0.
            let third = swapchain.try_acquire_image();
            ensure!(third == Some(2), "third acquire returned {third:?}");
            let fourth = swapchain.try_acquire_image();
            ensure!(fourth == Some(0), "released image 0 was not reacquired: {fourth:?}");
            Ok(())
        })
        .unwrap();
    assert_eq!(report.stats.submitted_frames, 2);
}

#[test]
fn acquire_waits_for_the_display_to_move_on() {
    ReprojectionHarness::new(32, 32)
        .run(identity_pose, |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(32, 32, 2))?;
            for _ in 0..6 {
                let Some(index) = ctx.acquire_image(&swapchain) else {
                    bail!("engine closed during acquire");
                };
                submit(&ctx, &swapchain, index)?;
                // Only the displayed image stays held once the display moved on.
                wait_until(&ctx, |_| swapchain.acquired_count() == 1)?;
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn camera_pose_is_visible_after_submit() {
    ReprojectionHarness::new(32, 32)
        .run(identity_pose, |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(32, 32, 2))?;
            let index = swapchain.acquire_image();
            let (_, before) = ctx.camera_pose();
            submit(&ctx, &swapchain, index)?;
            wait_until(&ctx, |ctx| ctx.camera_pose().1.time > before.time)?;
            let (pose, info) = ctx.camera_pose();
            ensure!(pose == info.real_pose);
            ensure!(ctx.submitted_frames() == 1);
            Ok(())
        })
        .unwrap();
}

fn walk(last: &Pose, _delta: PoseDelta, keys: &dyn KeyTimes) -> Pose {
    let mut pose = last.clone();
    pose.position.z -= keys.held_time(KeyCode::KeyW) as f32;
    pose
}

#[test]
fn held_key_time_restarts_after_submit() {
    let tick = 1.0 / 60.0;
    let input = ScriptedInput::new().press(1, KeyCode::KeyW);
    ReprojectionHarness::new(32, 32)
        .with_input(input)
        .run(walk, move |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(32, 32, 2))?;
            let index = swapchain.acquire_image();

            // Hold W for half a second before the first submission.
            wait_until(&ctx, |ctx| ctx.camera_pose().0.position.z < -0.5)?;

            let submitted_at = ctx.now();
            let (pose, info) = ctx.camera_pose();
            let anchor_z = info.real_pose.position.z;
            let layer = FrameLayer::new(Arc::clone(&swapchain), index, 1.0);
            ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;

            wait_until(&ctx, |ctx| ctx.camera_pose().1.time > submitted_at + 3.0 * tick)?;
            let (pose, info) = ctx.camera_pose();
            let travelled = f64::from(anchor_z - pose.position.z);
            let since_submit = info.time - submitted_at;
            ensure!(travelled >= 0.0, "moved backwards: {travelled}");
            ensure!(
                travelled <= since_submit + 2.0 * tick,
                "held time not reset: moved {travelled} in {since_submit}s"
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn shutdown_from_app_thread_stops_engine() {
    let report = ReprojectionHarness::new(16, 16)
        .run(identity_pose, |ctx| {
            ctx.shutdown();
            ensure!(ctx.should_close());
            Ok(())
        })
        .unwrap();
    assert_eq!(report.stats.submitted_frames, 0);
}

/// Pose function that parks the display thread once, between its copy of the
/// last frame and the draw.
#[derive(Default)]
struct DisplayGate {
    armed: AtomicBool,
    parked: AtomicBool,
    open: AtomicBool,
}

struct Gated(Arc<DisplayGate>);

impl PoseFunction<()> for Gated {
    fn compute(&self, last: &Pose, _delta: PoseDelta, _keys: &dyn KeyTimes) -> Pose {
        let gate = &self.0;
        if gate.armed.swap(false, Ordering::AcqRel) {
            gate.parked.store(true, Ordering::Release);
            while !gate.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
        }
        last.clone()
    }
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn replaced_image_stays_held_while_the_display_draws_it() {
    let gate = Arc::new(DisplayGate::default());
    let app_gate = Arc::clone(&gate);

    // Record the centre pixel of every presented frame.
    let compositor = reproj_gpu::SoftwareCompositor::new(8, 8);
    let sink = compositor.present_sink();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let script_seen = Arc::clone(&seen);
    let app_seen = Arc::clone(&seen);
    let host = HeadlessHost::new(8, 8)
        .with_compositor(compositor)
        .with_input_script(move |_, _, _| {
            if let Some(frame) = sink.latest() {
                script_seen.lock().push(frame.get_pixel(4, 4).0);
            }
        });

    let mut engine: Reprojection<HeadlessHost> =
        Reprojection::new(host, ReprojectionConfig::default().with_target_tick_rate(1000));
    engine.initialize().unwrap();
    engine.register_pose_function(Gated(gate));
    engine
        .start_reprojection(move |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(8, 8, 2).with_depth(false))?;

            let first = swapchain.acquire_image();
            fill_target(swapchain.image(first)?, RED, 1.0);
            submit(&ctx, &swapchain, first)?;
            wait_until(&ctx, |_| app_seen.lock().contains(&RED))?;

            // Park the display after it copied the red frame.
            app_gate.armed.store(true, Ordering::Release);
            wait_until(&ctx, |_| app_gate.parked.load(Ordering::Acquire))?;

            let second = swapchain.acquire_image();
            fill_target(swapchain.image(second)?, BLUE, 1.0);
            submit(&ctx, &swapchain, second)?;

            // The parked tick still samples the red image.
            let reused = swapchain.try_acquire_image();
            app_gate.open.store(true, Ordering::Release);
            ensure!(reused.is_none(), "image {reused:?} handed out while on display");

            let Some(third) = ctx.acquire_image(&swapchain) else {
                bail!("engine closed during acquire");
            };
            ensure!(third == first, "ring returned {third}");
            fill_target(swapchain.image(third)?, GREEN, 1.0);
            let presented = app_seen.lock().len();
            wait_until(&ctx, |_| app_seen.lock().len() > presented + 2)?;
            Ok(())
        })
        .unwrap();

    let seen = seen.lock();
    assert!(seen.contains(&RED));
    assert!(!seen.contains(&GREEN), "unsubmitted content was presented");
    assert_eq!(seen.last(), Some(&BLUE));
}
