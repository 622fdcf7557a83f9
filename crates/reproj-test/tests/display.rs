//! Presented output of the headless display.

use std::sync::Arc;

use anyhow::bail;
use glam::{DVec2, Vec3};
use image::{Rgba, RgbaImage};
use reproj_core::{Pose, PoseInfo};
use reproj_engine::{FrameLayer, FrameLayerFlags, FrameSubmitInfo, PoseDelta};
use reproj_gpu::{SoftwareTarget, SwapchainDesc};
use reproj_input::KeyTimes;
use reproj_test::{
    fill_target, identity_pose, wait_until, FlyCamera, ReprojectionHarness, ScriptedInput,
    VisualTestConfig,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const SIZE: u32 = 64;

/// Left half `left`, right half `right`, every texel at `depth`.
fn split(target: &SoftwareTarget, left: [u8; 4], right: [u8; 4], depth: f32) {
    let mut buffers = target.write();
    for y in 0..SIZE {
        for x in 0..SIZE {
            let color = if x < SIZE / 2 { left } else { right };
            buffers.write(x, y, color, depth);
        }
    }
}

#[test]
fn still_camera_presents_the_frame_unchanged() {
    let report = ReprojectionHarness::new(SIZE, SIZE)
        .run(identity_pose, |ctx| {
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(SIZE, SIZE, 2))?;
            let Some(index) = ctx.acquire_image(&swapchain) else {
                bail!("engine closed");
            };
            fill_target(swapchain.image(index)?, RED, 0.5);

            let (pose, info) = ctx.camera_pose();
            let layer = FrameLayer::new(Arc::clone(&swapchain), index, ctx.projection().fov_y);
            ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;

            let submitted_at = ctx.now();
            wait_until(&ctx, |ctx| ctx.now() > submitted_at + 0.1)
        })
        .unwrap();

    let frame = report.last_frame.unwrap();
    let expected = RgbaImage::from_pixel(SIZE, SIZE, Rgba(RED));
    VisualTestConfig::default()
        .check("still_camera", &expected, &frame)
        .unwrap();
    assert!(report.presented > 0);
}

#[test]
fn turning_shifts_world_layers_but_not_locked_ones() {
    let camera = FlyCamera::default().with_sensitivity(0.001);
    // 300 px at 0.001 rad/px turns the view 0.3 rad to the right.
    let input = ScriptedInput::new().move_cursor(1, 300.0, 0.0);

    let report = ReprojectionHarness::new(SIZE, SIZE)
        .with_input(input)
        .with_captured_cursor()
        .run(camera, |ctx| {
            let fov = ctx.projection().fov_y;
            let scene = ctx.create_swapchain(SwapchainDesc::new(SIZE, SIZE, 2))?;
            let hud = ctx.create_swapchain(SwapchainDesc::new(SIZE, SIZE, 2))?;
            let scene_index = scene.acquire_image();
            let hud_index = hud.acquire_image();
            split(scene.image(scene_index)?, RED, BLUE, 0.5);
            split(hud.image(hud_index)?, GREEN, CLEAR, 0.5);

            // Anchor at the origin cursor so the scripted motion counts as
            // movement since this frame no matter when it arrives.
            let pose = Pose::default();
            let info = PoseInfo::new(DVec2::ZERO, ctx.now(), pose.clone());
            let submit = FrameSubmitInfo::new(pose, info)
                .with_layer(
                    FrameLayer::new(Arc::clone(&hud), hud_index, fov)
                        .with_flags(FrameLayerFlags::CAMERA_LOCKED),
                )
                .with_layer(FrameLayer::new(Arc::clone(&scene), scene_index, fov));
            ctx.submit_frame(submit)?;

            wait_until(&ctx, |ctx| ctx.cursor_position().x > 0.0)?;
            let moved_at = ctx.now();
            wait_until(&ctx, |ctx| ctx.now() > moved_at + 0.1)
        })
        .unwrap();

    let frame = report.last_frame.unwrap();
    let mid = SIZE / 2;
    // Locked HUD keeps its opaque left half.
    assert_eq!(*frame.get_pixel(4, mid), Rgba(GREEN));
    // The scene slid left: the center now shows its right half.
    assert_eq!(*frame.get_pixel(mid + 2, mid), Rgba(BLUE));
    // Past the frame's right edge only the clear color remains.
    assert_eq!(*frame.get_pixel(SIZE - 2, mid), BLACK);
}

/// Display camera half a unit right of wherever the last frame was rendered.
fn step_right(last: &Pose, _delta: PoseDelta, _keys: &dyn KeyTimes) -> Pose {
    let mut pose = last.clone();
    pose.position.x += 0.5;
    pose
}

/// Present a red/blue wall two units ahead of the frame camera, viewed after
/// the camera stepped right.
fn present_wall(flags: FrameLayerFlags) -> RgbaImage {
    let report = ReprojectionHarness::new(SIZE, SIZE)
        .run(step_right, move |ctx| {
            let projection = ctx.projection();
            let wall_depth = projection.app_matrix().project_point3(Vec3::new(0.0, 0.0, -2.0)).z;
            let swapchain = ctx.create_swapchain(SwapchainDesc::new(SIZE, SIZE, 2))?;
            let index = swapchain.acquire_image();
            split(swapchain.image(index)?, RED, BLUE, wall_depth);

            let pose = Pose::default();
            let info = PoseInfo::new(DVec2::ZERO, ctx.now(), pose.clone());
            let layer = FrameLayer::new(Arc::clone(&swapchain), index, projection.fov_y)
                .with_flags(flags);
            ctx.submit_frame(FrameSubmitInfo::new(pose, info).with_layer(layer))?;

            let submitted_at = ctx.now();
            wait_until(&ctx, |ctx| ctx.now() > submitted_at + 0.1)
        })
        .unwrap();
    report.last_frame.unwrap()
}

/// First column of the middle row showing blue.
fn blue_edge(frame: &RgbaImage) -> u32 {
    (0..SIZE)
        .find(|&x| frame.get_pixel(x, SIZE / 2).0 == BLUE)
        .unwrap_or(SIZE)
}

#[test]
fn parallax_layer_moves_near_content_with_the_camera() {
    let plain = present_wall(FrameLayerFlags::empty());
    let parallax = present_wall(FrameLayerFlags::PARALLAX_ENABLED);

    // The plain warp pins the image to the far plane, so a half-unit step
    // barely moves the edge.
    let plain_edge = blue_edge(&plain);
    assert!((SIZE / 2 - 2..=SIZE / 2 + 1).contains(&plain_edge), "plain edge {plain_edge}");

    // Marching the stored depth places the wall two units away, where the
    // same step slides it noticeably left.
    let parallax_edge = blue_edge(&parallax);
    assert!(
        parallax_edge + 3 <= plain_edge,
        "parallax edge {parallax_edge}, plain {plain_edge}"
    );
    assert_eq!(parallax.get_pixel(SIZE - 2, SIZE / 2).0, BLUE);
}
