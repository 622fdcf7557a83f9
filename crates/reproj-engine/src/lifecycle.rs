//! Run state shared by the display loop, the application thread and
//! shutdown handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::info;

/// Where the engine is in its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// `start_reprojection` has not been called.
    Idle,
    /// The display loop is running.
    Running,
    /// The display loop has exited and the application thread was joined.
    Stopped,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    close_requested: AtomicBool,
    state: Mutex<RunState>,
    changed: Condvar,
    app_thread: Mutex<Option<ThreadId>>,
    display_thread: Mutex<Option<ThreadId>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            close_requested: AtomicBool::new(false),
            state: Mutex::new(RunState::Idle),
            changed: Condvar::new(),
            app_thread: Mutex::new(None),
            display_thread: Mutex::new(None),
        }
    }

    pub(crate) fn request_close(&self) {
        if !self.close_requested.swap(true, Ordering::AcqRel) {
            info!("Close requested");
        }
    }

    pub(crate) fn is_close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    /// Move from idle to running. Returns `false` if the engine ever ran.
    ///
    /// The calling thread becomes the display thread.
    pub(crate) fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if *state != RunState::Idle {
            return false;
        }
        *state = RunState::Running;
        *self.display_thread.lock() = Some(thread::current().id());
        drop(state);
        self.changed.notify_all();
        true
    }

    pub(crate) fn finish(&self) {
        *self.state.lock() = RunState::Stopped;
        self.changed.notify_all();
    }

    pub(crate) fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub(crate) fn wait_until_stopped(&self) {
        let mut state = self.state.lock();
        while *state == RunState::Running {
            self.changed.wait(&mut state);
        }
    }

    pub(crate) fn set_app_thread(&self, id: ThreadId) {
        *self.app_thread.lock() = Some(id);
    }

    /// Returns `true` on the threads that have to return before the engine
    /// can stop: the application thread and the display thread.
    pub(crate) fn is_engine_thread(&self) -> bool {
        let current = Some(thread::current().id());
        *self.app_thread.lock() == current || *self.display_thread.lock() == current
    }
}

/// Requests a running engine to stop.
///
/// Cloneable and usable from any thread.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    lifecycle: Arc<Lifecycle>,
}

impl ShutdownHandle {
    pub(crate) const fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Request termination and wait until the application thread has been
    /// joined.
    ///
    /// Called from the application thread or the display thread this only
    /// requests; the caller has to return for the engine to stop.
    pub fn shutdown(&self) {
        self.lifecycle.request_close();
        if self.lifecycle.is_engine_thread() {
            return;
        }
        self.lifecycle.wait_until_stopped();
    }

    /// Returns `true` once termination was requested.
    pub fn is_close_requested(&self) -> bool {
        self.lifecycle.is_close_requested()
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.lifecycle.state()
    }
}

/// Requests close when dropped, so a panicking application thread still
/// stops the display loop.
pub(crate) struct CloseOnDrop(pub(crate) Arc<Lifecycle>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.request_close();
    }
}
