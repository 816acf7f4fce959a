use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// Task accounting shared by every submitter and worker.
///
/// `in_flight >= unassigned` holds at every instant: submission bumps
/// `in_flight` first, and a worker drops `unassigned` when a task starts
/// but `in_flight` only when it finishes.
pub(crate) struct Counters {
    /// Tasks queued but not yet started.
    pub(crate) unassigned: AtomicUsize,

    /// Tasks queued or running.
    pub(crate) in_flight: AtomicUsize,

    /// Completion flag, true exactly while `in_flight` is zero.
    idle: Mutex<bool>,

    /// Wakes callers blocked in [`wait_idle`](Self::wait_idle).
    condvar: Condvar,
}

impl Counters {
    pub(crate) fn new() -> Self {
        Self {
            unassigned: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            idle: Mutex::new(true),
            condvar: Condvar::new(),
        }
    }

    /// Accounts for a newly submitted task.
    pub(crate) fn submitted(&self) {
        if self.in_flight.fetch_add(1, Ordering::AcqRel) == 0 {
            self.refresh();
        }
        self.unassigned.fetch_add(1, Ordering::AcqRel);
    }

    /// Accounts for a task leaving its queue to run.
    pub(crate) fn started(&self) {
        self.unassigned.fetch_sub(1, Ordering::AcqRel);
    }

    /// Accounts for a finished task.
    pub(crate) fn finished(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.refresh();
        }
    }

    /// Accounts for a task that was dropped from a queue without running.
    pub(crate) fn discarded(&self) {
        self.started();
        self.finished();
    }

    pub(crate) fn has_unassigned(&self) -> bool {
        self.unassigned.load(Ordering::Acquire) > 0
    }

    /// Re-derives the completion flag from `in_flight`.
    ///
    /// Called on every 0 -> 1 and 1 -> 0 transition. The counter is read
    /// under the flag's lock, so whichever transition takes the lock last
    /// leaves the flag matching the counter, and a waiter that already
    /// checked the flag is parked before the notify can be sent.
    fn refresh(&self) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        *idle = self.in_flight.load(Ordering::Acquire) == 0;

        if *idle {
            self.condvar.notify_all();
        }
    }

    /// Blocks until the completion flag is set.
    ///
    /// Returns at once when nothing is in flight. Tasks submitted
    /// concurrently with this call may or may not be waited for.
    pub(crate) fn wait_idle(&self) {
        if self.in_flight.load(Ordering::Acquire) == 0 {
            return;
        }

        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let _idle = self
            .condvar
            .wait_while(idle, |idle| !*idle)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
