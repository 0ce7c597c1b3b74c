//! CPU-GPU synchronization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{GraphicsError, GraphicsResult};

#[derive(Debug)]
struct FenceState {
    signaled: Mutex<bool>,
    condvar: Condvar,
    /// Point in time at which the work counts as complete without an explicit signal.
    deadline: Option<Instant>,
}

impl FenceState {
    fn new(signaled: bool, deadline: Option<Instant>) -> Arc<Self> {
        Arc::new(Self {
            signaled: Mutex::new(signaled),
            condvar: Condvar::new(),
            deadline,
        })
    }

    fn signal(&self) {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            *signaled = true;
            self.condvar.notify_all();
        }
    }
}

/// A one-shot completion signal for submitted GPU work.
///
/// Fences are created by [`CommandEncoder::create_fence`] and signaled by the
/// backend once every command submitted before them has finished. A fence is
/// signaled exactly once; waiting on a signaled fence returns immediately.
///
/// # Example
///
/// ```ignore
/// let fence = encoder.create_fence();
/// if !fence.await_completion(Some(Duration::from_millis(16))) {
///     // Still running; try again next frame.
/// }
/// ```
///
/// [`CommandEncoder::create_fence`]: crate::CommandEncoder::create_fence
#[derive(Debug)]
pub struct GpuFence {
    state: Arc<FenceState>,
    closed: bool,
}

/// The signaling half of a pending [`GpuFence`], held by the backend.
#[derive(Debug, Clone)]
pub struct FenceSignal {
    state: Arc<FenceState>,
}

impl FenceSignal {
    /// Mark the work as complete and wake every waiter.
    pub fn signal(&self) {
        self.state.signal();
    }

    /// Returns true if the fence has been signaled.
    pub fn is_signaled(&self) -> bool {
        *self.state.signaled.lock()
    }
}

impl GpuFence {
    /// Create a fence that is already signaled.
    pub fn signaled() -> Self {
        Self {
            state: FenceState::new(true, None),
            closed: false,
        }
    }

    /// Create an unsignaled fence together with the handle that signals it.
    pub fn pending() -> (Self, FenceSignal) {
        let state = FenceState::new(false, None);
        let signal = FenceSignal {
            state: Arc::clone(&state),
        };
        (
            Self {
                state,
                closed: false,
            },
            signal,
        )
    }

    /// Create a fence that becomes signaled once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: FenceState::new(false, Some(deadline)),
            closed: false,
        }
    }

    /// Check whether the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        let mut signaled = self.state.signaled.lock();
        if !*signaled && self.deadline_passed(Instant::now()) {
            *signaled = true;
            self.state.condvar.notify_all();
        }
        *signaled
    }

    /// Block until the fence is signaled or `timeout` elapses.
    ///
    /// `None` waits forever. Returns `false` if the timeout elapsed first; the
    /// fence is left untouched in that case and can be waited on again.
    pub fn await_completion(&self, timeout: Option<Duration>) -> bool {
        let limit = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut signaled = self.state.signaled.lock();

        loop {
            if *signaled {
                return true;
            }

            let now = Instant::now();
            if self.deadline_passed(now) {
                *signaled = true;
                self.state.condvar.notify_all();
                return true;
            }
            if limit.is_some_and(|limit| now >= limit) {
                return false;
            }

            let wake = match (self.state.deadline, limit) {
                (Some(deadline), Some(limit)) => Some(deadline.min(limit)),
                (Some(deadline), None) => Some(deadline),
                (None, limit) => limit,
            };
            match wake {
                Some(wake) => {
                    self.state.condvar.wait_until(&mut signaled, wake);
                }
                None => self.state.condvar.wait(&mut signaled),
            }
        }
    }

    /// Nanosecond form of [`await_completion`](Self::await_completion).
    ///
    /// `u64::MAX` waits forever.
    pub fn await_completion_nanos(&self, timeout_nanos: u64) -> bool {
        let timeout = (timeout_nanos != u64::MAX).then(|| Duration::from_nanos(timeout_nanos));
        self.await_completion(timeout)
    }

    /// Release the fence. Never blocks, even if the work is still running.
    pub fn close(&mut self) -> GraphicsResult<()> {
        if self.closed {
            return Err(GraphicsError::ResourceReleased("fence".to_string()));
        }
        self.closed = true;
        Ok(())
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn deadline_passed(&self, now: Instant) -> bool {
        self.state.deadline.is_some_and(|deadline| now >= deadline)
    }
}

static_assertions::assert_impl_all!(GpuFence: Send, Sync);
