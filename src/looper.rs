//! The application thread's event loop.
//!
//! Two named sources feed the loop: the command pipe and the input queue.
//! Each source holds a [`Waker`] and bumps its pending counter when it has
//! something to deliver; the loop's single blocking [`Looper::poll`] hands
//! back one ready source per call, commands first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Identifies one of the loop's registered poll sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    /// Lifecycle commands arriving over the command pipe.
    Commands,
    /// Events arriving on the attached input queue.
    Input,
}

impl SourceId {
    fn index(self) -> usize {
        match self {
            Self::Commands => 0,
            Self::Input => 1,
        }
    }
}

/// Outcome of one blocking wait on the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// The named source has at least one notification to process.
    Source(SourceId),
    /// The wait elapsed without any source becoming ready.
    Timeout,
}

struct LooperShared {
    // One pending-notification counter per source; a source wakes once per
    // delivered item so the loop sees one readiness per notification.
    pending: Mutex<[usize; 2]>,
    cond: Condvar,
}

/// Handle a source uses to signal readiness to the owning loop.
///
/// Cheap to clone; safe to invoke from any thread.
#[derive(Clone)]
pub struct Waker {
    shared: Arc<LooperShared>,
    id: SourceId,
}

impl Waker {
    /// Record one pending notification for this source and wake the loop.
    pub fn wake(&self) {
        let mut pending = self.shared.pending.lock();
        pending[self.id.index()] += 1;
        self.shared.cond.notify_one();
    }
}

/// The blocking event loop owned by the application thread.
pub struct Looper {
    shared: Arc<LooperShared>,
}

impl Looper {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(LooperShared {
                pending: Mutex::new([0, 0]),
                cond: Condvar::new(),
            }),
        }
    }

    /// A waker that marks `id` ready when invoked.
    pub fn waker(&self, id: SourceId) -> Waker {
        Waker {
            shared: self.shared.clone(),
            id,
        }
    }

    /// Block until a source is ready or the timeout elapses.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` returns immediately,
    /// which is how an animating loop keeps drawing between events. When both
    /// sources are ready, commands win.
    pub fn poll(&self, timeout: Option<Duration>) -> PollEvent {
        let mut pending = self.shared.pending.lock();
        loop {
            for id in [SourceId::Commands, SourceId::Input] {
                if pending[id.index()] > 0 {
                    pending[id.index()] -= 1;
                    return PollEvent::Source(id);
                }
            }
            match timeout {
                None => self.shared.cond.wait(&mut pending),
                Some(wait) => {
                    if wait.is_zero()
                        || self.shared.cond.wait_for(&mut pending, wait).timed_out()
                    {
                        return PollEvent::Timeout;
                    }
                }
            }
        }
    }
}

impl Default for Looper {
    fn default() -> Self {
        Self::new()
    }
}
