//! Engine runs under a manual clock with scripted input.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use reproj_core::{ManualClock, TimeSource};
use reproj_engine::{
    AppContext, HeadlessHost, PoseFunction, Reprojection, ReprojectionConfig, ReprojectionStats,
};
use reproj_gpu::SoftwareDevice;
use reproj_input::{HostInput, KeyCode};

use crate::{Result, TestError, VisualTestConfig};

/// One scripted input change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    Press(KeyCode),
    Release(KeyCode),
    MoveCursor(f64, f64),
    SetCursor(f64, f64),
}

/// Input changes keyed by the display tick after which they happen.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: Vec<(u64, InputAction)>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(mut self, tick: u64, action: InputAction) -> Self {
        self.events.push((tick, action));
        self
    }

    #[must_use]
    pub fn press(self, tick: u64, key: KeyCode) -> Self {
        self.at(tick, InputAction::Press(key))
    }

    #[must_use]
    pub fn release(self, tick: u64, key: KeyCode) -> Self {
        self.at(tick, InputAction::Release(key))
    }

    #[must_use]
    pub fn move_cursor(self, tick: u64, dx: f64, dy: f64) -> Self {
        self.at(tick, InputAction::MoveCursor(dx, dy))
    }

    /// Apply every action scheduled for `tick`.
    pub fn apply(&self, input: &mut HostInput, tick: u64, now: f64) {
        for (_, action) in self.events.iter().filter(|(at, _)| *at == tick) {
            match *action {
                InputAction::Press(key) => input.press(key, now),
                InputAction::Release(key) => input.release(key),
                InputAction::MoveCursor(dx, dy) => input.move_cursor(dx, dy),
                InputAction::SetCursor(x, y) => input.set_cursor_position(x, y),
            }
        }
    }
}

/// Outcome of a harness run.
#[derive(Debug, Clone)]
pub struct HarnessReport {
    pub stats: ReprojectionStats,
    /// Frames presented by the headless display.
    pub presented: u64,
    /// Last presented frame.
    pub last_frame: Option<RgbaImage>,
    /// Clock reading when the display loop stopped.
    pub end_time: f64,
}

/// Builds and runs an engine on a [`HeadlessHost`].
///
/// The clock advances by a fixed interval after every display tick, so tick
/// counts and timestamps are reproducible.
pub struct ReprojectionHarness {
    width: u32,
    height: u32,
    config: ReprojectionConfig,
    clock: ManualClock,
    tick_interval: f64,
    max_ticks: u64,
    input: ScriptedInput,
    projection: (f32, f32, f32, f32),
    capture_cursor: bool,
}

impl ReprojectionHarness {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            config: ReprojectionConfig::default(),
            clock: ManualClock::new(0.0),
            tick_interval: 1.0 / 60.0,
            max_ticks: 10_000,
            input: ScriptedInput::new(),
            projection: (0.1, 100.0, std::f32::consts::FRAC_PI_2, width as f32 / height as f32),
            capture_cursor: false,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ReprojectionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn with_tick_interval(mut self, seconds: f64) -> Self {
        self.tick_interval = seconds;
        self
    }

    #[must_use]
    pub const fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: ScriptedInput) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub const fn with_projection(mut self, near: f32, far: f32, fov_y: f32, aspect: f32) -> Self {
        self.projection = (near, far, fov_y, aspect);
        self
    }

    /// Capture the cursor before starting, so mouse motion reaches poses.
    #[must_use]
    pub const fn with_captured_cursor(mut self) -> Self {
        self.capture_cursor = true;
        self
    }

    /// The clock the engine runs on.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Run `app` until it returns or the tick limit is reached.
    pub fn run<F>(self, pose_fn: impl PoseFunction<()> + 'static, app: F) -> Result<HarnessReport>
    where
        F: FnOnce(AppContext<SoftwareDevice>) -> anyhow::Result<()> + Send + 'static,
    {
        let script_clock = self.clock.clone();
        let interval = self.tick_interval;
        let input = self.input;
        let host = HeadlessHost::new(self.width, self.height)
            .with_max_ticks(self.max_ticks)
            .with_input_script(move |host_input, tick, _| {
                script_clock.advance(interval);
                input.apply(host_input, tick, script_clock.now());
            });
        let sink = host.present_sink();

        let mut engine: Reprojection<HeadlessHost> =
            Reprojection::new(host, self.config).with_clock(Arc::new(self.clock.clone()));
        engine.initialize()?;
        let (near, far, fov_y, aspect) = self.projection;
        engine.update_projection(near, far, fov_y, aspect)?;
        engine.register_pose_function(pose_fn);
        if self.capture_cursor {
            engine.capture_cursor();
        }
        engine.start_reprojection(app)?;

        Ok(HarnessReport {
            stats: engine.stats().unwrap_or_default(),
            presented: sink.presented(),
            last_frame: sink.latest(),
            end_time: self.clock.now(),
        })
    }
}

/// Block the application thread until `ready` holds.
///
/// Fails if the engine starts closing first.
pub fn wait_until(
    ctx: &AppContext<SoftwareDevice>,
    mut ready: impl FnMut(&AppContext<SoftwareDevice>) -> bool,
) -> anyhow::Result<()> {
    while !ready(ctx) {
        anyhow::ensure!(!ctx.should_close(), "engine closed while waiting");
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

/// Normalized RGB difference of two images (0.0-1.0).
pub fn compare_images(a: &RgbaImage, b: &RgbaImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(TestError::ImageComparison(format!(
            "Image dimensions don't match: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }

    let total_diff: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            (0..3)
                .map(|c| u64::from(pa[c].abs_diff(pb[c])))
                .sum::<u64>()
        })
        .sum();

    let max_diff = (u64::from(a.width()) * u64::from(a.height()) * 3 * 255) as f64;
    if max_diff == 0.0 {
        return Ok(0.0);
    }
    Ok(total_diff as f64 / max_diff)
}

/// Differences in red over a dimmed copy of `a`.
pub fn diff_image(a: &RgbaImage, b: &RgbaImage) -> RgbaImage {
    let (width, height) = a.dimensions();
    let mut diff = RgbaImage::new(width, height);

    for (x, y, pixel) in diff.enumerate_pixels_mut() {
        let pa = a.get_pixel(x, y);
        let Some(pb) = b.get_pixel_checked(x, y) else {
            *pixel = Rgba([255, 0, 0, 255]);
            continue;
        };
        let max_diff = (0..3).map(|c| pa[c].abs_diff(pb[c])).max().unwrap_or(0);
        *pixel = if max_diff > 10 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([pa[0] / 2, pa[1] / 2, pa[2] / 2, 255])
        };
    }

    diff
}

impl VisualTestConfig {
    /// Compare `actual` to `expected`, saving both and a diff on mismatch.
    pub fn check(&self, name: &str, expected: &RgbaImage, actual: &RgbaImage) -> Result<()> {
        let diff = compare_images(expected, actual)?;
        if diff <= self.threshold {
            return Ok(());
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let dir = Path::new(&self.output_dir);
        expected.save(dir.join(format!("{name}_expected.png")))?;
        actual.save(dir.join(format!("{name}_actual.png")))?;
        let diff_path = dir.join(format!("{name}_diff.png"));
        diff_image(expected, actual).save(&diff_path)?;
        tracing::info!("Saved failing comparison to {}", diff_path.display());

        Err(TestError::ImageComparison(format!(
            "Image difference {diff:.4} exceeds threshold {:.4} (see {})",
            self.threshold,
            diff_path.display()
        )))
    }
}
