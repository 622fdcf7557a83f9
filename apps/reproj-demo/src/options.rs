//! Command line options.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Demo settings parsed from the command line.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub width: u32,
    pub height: u32,
    /// Display ticks to run before closing.
    pub ticks: u64,
    /// Display refresh rate.
    pub tick_rate: u32,
    /// Extra time spent per rendered frame, simulating a heavy renderer.
    pub render_delay: Duration,
    pub parallax: bool,
    pub screenshots: ScreenshotConfig,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            ticks: 600,
            tick_rate: 60,
            render_delay: Duration::from_millis(45),
            parallax: true,
            screenshots: ScreenshotConfig::default(),
        }
    }
}

impl DemoOptions {
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_args(&args)
    }

    pub fn parse_args(args: &[String]) -> Self {
        let mut options = Self::default();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            let mut consumed = true;
            match (args[i].as_str(), value) {
                ("--width", Some(v)) => options.width = v.parse().unwrap_or(options.width),
                ("--height", Some(v)) => options.height = v.parse().unwrap_or(options.height),
                ("--ticks", Some(v)) => options.ticks = v.parse().unwrap_or(options.ticks),
                ("--tick-rate", Some(v)) => {
                    options.tick_rate = v.parse().unwrap_or(options.tick_rate);
                }
                ("--render-delay", Some(v)) => {
                    if let Ok(ms) = v.parse() {
                        options.render_delay = Duration::from_millis(ms);
                    }
                }
                _ => consumed = false,
            }
            if consumed {
                i += 1;
            } else if args[i] == "--no-parallax" {
                options.parallax = false;
            }
            i += 1;
        }

        options.screenshots = ScreenshotConfig::parse_args(args);
        options
    }
}

/// Which display ticks to save and where.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    /// Output path pattern (`{}` becomes the tick number).
    pub output_pattern: String,
    pub ticks: HashSet<u64>,
}

impl ScreenshotConfig {
    pub fn parse_args(args: &[String]) -> Self {
        let mut config = Self::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-S" | "--screenshot" => config.enabled = true,
                "-o" | "--output" => {
                    if let Some(pattern) = args.get(i + 1) {
                        config.output_pattern.clone_from(pattern);
                        i += 1;
                    }
                }
                "-f" | "--frames" => {
                    if let Some(ticks) = args.get(i + 1) {
                        config.ticks = parse_tick_indices(ticks);
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        if config.enabled {
            if config.output_pattern.is_empty() {
                config.output_pattern = "reprojection_{}.png".to_string();
            }
            if config.ticks.is_empty() {
                config.ticks.insert(1);
            }
        }

        config
    }

    pub fn output_path(&self, tick: u64) -> PathBuf {
        PathBuf::from(self.output_pattern.replace("{}", &tick.to_string()))
    }

    pub fn should_capture(&self, tick: u64) -> bool {
        self.enabled && self.ticks.contains(&tick)
    }
}

/// Parse tick indices like "0,5,10-15".
pub fn parse_tick_indices(s: &str) -> HashSet<u64> {
    let mut ticks = HashSet::new();

    for part in s.split(',').map(str::trim) {
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) {
                ticks.extend(start..=end);
            }
        } else if let Ok(tick) = part.parse::<u64>() {
            ticks.insert(tick);
        }
    }

    ticks
}
