//! Progress reporting and cooperative cancellation for long-running operations.
//!
//! Every long loop in the crate (droplets, tiles) accepts a [`TaskMonitor`]. The
//! monitor receives progress updates and is polled for cancellation between
//! units of work; nothing is interrupted forcefully.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{Result, TerrainError};

/// A snapshot of how far an operation has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: &'static str,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Returns completion in `[0, 1]`. An operation with no work is complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f32 / self.total as f32).min(1.0)
        }
    }
}

/// Observer for long-running operations.
pub trait TaskMonitor: Sync {
    /// Called periodically with the current progress.
    fn on_progress(&self, _progress: Progress) {}

    /// Polled between units of work; returning `true` aborts with `Cancelled`.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Monitor that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl TaskMonitor for Silent {}

/// Adapts a closure into a progress-only monitor.
pub struct ProgressFn<F>(pub F);

impl<F> TaskMonitor for ProgressFn<F>
where
    F: Fn(Progress) + Sync,
{
    fn on_progress(&self, progress: Progress) {
        (self.0)(progress);
    }
}

/// Shared, pollable status of an operation plus a cancellation flag.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
    stage: Mutex<&'static str>,
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            stage: Mutex::new("pending"),
        }
    }
}

impl TaskHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns the most recently reported progress.
    pub fn status(&self) -> Progress {
        let stage = *self.stage.lock().unwrap_or_else(|e| e.into_inner());
        Progress {
            stage,
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

impl TaskMonitor for TaskHandle {
    fn on_progress(&self, progress: Progress) {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner()) = progress.stage;
        self.total.store(progress.total, Ordering::Relaxed);
        self.completed.store(progress.completed, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Returns `Err(Cancelled)` if the monitor has requested cancellation.
pub(crate) fn check_cancelled(monitor: &dyn TaskMonitor) -> Result<()> {
    if monitor.is_cancelled() {
        Err(TerrainError::Cancelled)
    } else {
        Ok(())
    }
}

/// An operation running on a worker thread, observable through its [`TaskHandle`].
pub struct BackgroundTask<T> {
    handle: Arc<TaskHandle>,
    join: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Runs `work` on a new thread. The closure receives the shared handle to
    /// report progress and poll for cancellation.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&TaskHandle) -> Result<T> + Send + 'static,
    {
        let handle = TaskHandle::new();
        let worker_handle = Arc::clone(&handle);
        let join = std::thread::spawn(move || work(&worker_handle));
        Self { handle, join }
    }

    pub fn handle(&self) -> &Arc<TaskHandle> {
        &self.handle
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Waits for the worker and returns its result. A panicked worker is
    /// re-raised on the calling thread.
    pub fn join(self) -> Result<T> {
        match self.join.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
