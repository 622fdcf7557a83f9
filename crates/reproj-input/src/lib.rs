//! Input aggregation for the reprojection engine.
//!
//! The reprojection tick does not consume raw events. It only needs two
//! things from the host every display refresh: the absolute cursor position
//! and the set of keys currently held down. This crate turns those samples
//! into the inputs of an application pose function.
//!
//! # Core Types
//!
//! - [`HostInput`]: host-side state fed from window events (or a script)
//! - [`KeyboardState`]: keys currently down, with press timestamps
//! - [`CursorState`]: absolute cursor position and capture mode
//! - [`InputAggregator`]: engine-side accumulator of held-key durations
//! - [`KeyTimes`]: lookup capability handed to pose functions
//!
//! # Usage
//!
//! ```ignore
//! use reproj_input::{InputAggregator, KeyCode, KeyTimes};
//!
//! let mut input = InputAggregator::new();
//! input.sync_keyboard(host.keyboard());
//! input.accumulate(elapsed);
//!
//! let held = input.held_times().clone();
//! let forward = held.held_time(KeyCode::KeyW);
//!
//! // A frame was submitted: start a new accumulation epoch.
//! input.reset_epoch();
//! ```

mod aggregator;
mod cursor;
mod held;
mod host;
mod keyboard;

pub use aggregator::InputAggregator;
pub use cursor::{CursorMode, CursorState};
pub use held::{HeldKeyTimes, KeyTimes, PredictedKeyTimes};
pub use host::HostInput;
pub use keyboard::KeyboardState;

// Re-export winit types commonly used with input
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
