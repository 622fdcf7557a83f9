//! Reprojection demo.
//!
//! Renders a ray-traced scene on the application thread at a deliberately low
//! rate while the display loop re-presents it every tick, warped to a
//! scripted head motion. Runs headless; use the screenshot options to look at
//! the output.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p reproj-demo -- [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Capture a few display ticks
//! cargo run -p reproj-demo -- -S -f 30,60,90-95 -o tick_{}.png
//!
//! # Compare against the plain warp
//! cargo run -p reproj-demo -- --no-parallax -S -f 120
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod motion;
mod options;
mod scene;

use std::sync::Arc;
use std::thread;

use reproj_engine::{
    init_logging, AppContext, FrameLayer, FrameLayerFlags, FrameSubmitInfo, HeadlessHost,
    Reprojection, ReprojectionConfig,
};
use reproj_gpu::{SoftwareCompositor, SoftwareDevice, SwapchainDesc};
use tracing::{error, info};

use crate::motion::WalkCamera;
use crate::options::DemoOptions;
use crate::scene::{draw_hud, Scene};

const FOV_Y: f32 = 1.2;
const SCENE_IMAGES: usize = 3;
const HUD_IMAGES: usize = 2;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    init_logging();
    let options = DemoOptions::from_args();
    info!(
        width = options.width,
        height = options.height,
        ticks = options.ticks,
        parallax = options.parallax,
        "Starting reprojection demo"
    );

    let mut compositor = SoftwareCompositor::new(options.width, options.height);
    if !options.parallax {
        compositor = compositor.without_parallax();
    }
    let host = HeadlessHost::new(options.width, options.height).with_compositor(compositor);
    let sink = host.present_sink();
    let screenshots = options.screenshots.clone();
    let host = host
        .with_max_ticks(options.ticks)
        .with_input_script(move |input, tick, now| {
            motion::drive(input, tick, now);
            if screenshots.should_capture(tick) {
                if let Err(e) = sink.save_png(screenshots.output_path(tick)) {
                    error!("Failed to save screenshot: {e}");
                }
            }
        });

    let config = ReprojectionConfig::default().with_target_tick_rate(options.tick_rate);
    let mut engine: Reprojection<HeadlessHost> = Reprojection::new(host, config);
    engine.initialize()?;
    engine.update_projection(
        0.1,
        100.0,
        FOV_Y,
        options.width as f32 / options.height as f32,
    )?;
    engine.register_pose_function(WalkCamera);
    engine.capture_cursor();

    let app_options = options.clone();
    engine.start_reprojection(move |ctx| render_loop(&ctx, &app_options))?;

    if let Some(stats) = engine.stats() {
        info!(
            "Displayed {} ticks for {} rendered frames",
            stats.ticks, stats.submitted_frames
        );
    }
    Ok(())
}

/// Application thread: render, submit, repeat until the display closes.
fn render_loop(ctx: &AppContext<SoftwareDevice>, options: &DemoOptions) -> anyhow::Result<()> {
    let scene = Scene::default();
    let projection = ctx.projection();
    let scene_chain = ctx.create_swapchain(SwapchainDesc::new(
        options.width,
        options.height,
        SCENE_IMAGES,
    ))?;
    let hud_chain = ctx.create_swapchain(
        SwapchainDesc::new(options.width, options.height, HUD_IMAGES).with_depth(false),
    )?;

    let mut frames = 0u64;
    while !ctx.should_close() {
        let Some(scene_index) = ctx.acquire_image(&scene_chain) else {
            break;
        };
        let Some(hud_index) = ctx.acquire_image(&hud_chain) else {
            break;
        };

        let (pose, info) = if frames == 0 {
            let (_, mut info) = ctx.camera_pose();
            info.real_pose = motion::start_pose();
            (motion::start_pose(), info)
        } else {
            ctx.predicted_camera_pose(ctx.predicted_display_time())
        };

        scene.render(&pose, &projection, scene_chain.image(scene_index)?);
        draw_hud(hud_chain.image(hud_index)?, frames);
        thread::sleep(options.render_delay);

        let mut scene_flags = FrameLayerFlags::empty();
        if options.parallax {
            scene_flags |= FrameLayerFlags::PARALLAX_ENABLED;
        }
        let frame = FrameSubmitInfo::new(pose, info)
            .with_layer(
                FrameLayer::new(Arc::clone(&hud_chain), hud_index, FOV_Y)
                    .with_flags(FrameLayerFlags::CAMERA_LOCKED),
            )
            .with_layer(
                FrameLayer::new(Arc::clone(&scene_chain), scene_index, FOV_Y)
                    .with_flags(scene_flags),
            );
        ctx.submit_frame(frame)?;
        frames += 1;
    }

    info!(frames, "Renderer finished");
    Ok(())
}

fn print_help() {
    eprintln!(
        "Reprojection demo

USAGE:
    cargo run -p reproj-demo -- [OPTIONS]

DISPLAY OPTIONS:
    --width <N>             Display width (default: 640)
    --height <N>            Display height (default: 360)
    --ticks <N>             Display ticks before exiting (default: 600)
    --tick-rate <HZ>        Display refresh rate (default: 60)
    --render-delay <MS>     Extra render time per frame (default: 45)
    --no-parallax           Warp the scene without depth correction

SCREENSHOT OPTIONS:
    -S, --screenshot        Enable screenshot capture
    -o, --output <PATTERN>  Output path pattern (use {{}} for the tick number)
                            Default: reprojection_{{}}.png
    -f, --frames <TICKS>    Display ticks to capture
                            Examples: \"30\" \"30,60\" \"90-95\"
                            Default: 1

OTHER:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
