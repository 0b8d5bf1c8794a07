//! Cancellable scheduled tasks driven by an explicit clock.
//!
//! Nothing here owns a thread or a timer. The owner calls
//! [`Debouncer::take_due`] from its event loop with the current instant,
//! which keeps every timer cancellable and deterministic under test.

#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    /// Unique per scheduling, so a stale handle never cancels a newer task.
    generation: u64,
    due: Instant,
}

impl TaskHandle {
    pub fn due(&self) -> Instant {
        self.due
    }
}

/// Trailing-edge debouncer: each `schedule` pushes the deadline back to
/// `now + delay`, and the task fires once input has been quiet that long.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TaskHandle>,
    generation: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending task and schedule a new one at `now + delay`.
    pub fn schedule(&mut self, now: Instant) -> TaskHandle {
        self.generation = self.generation.wrapping_add(1);
        let handle = TaskHandle {
            generation: self.generation,
            due: now + self.delay,
        };
        self.pending = Some(handle);
        handle
    }

    /// Cancel the pending task, if any. Returns true if one was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Cancel only if `handle` is still the pending task.
    pub fn cancel_handle(&mut self, handle: TaskHandle) -> bool {
        if self.pending.is_some_and(|p| p.generation == handle.generation) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> Option<TaskHandle> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// If the pending task is due at `now`, clear it and return true.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(handle) if now >= handle.due => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
