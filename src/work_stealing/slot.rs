use crate::task::Task;
use crate::work_stealing::deque::ConcurrentDeque;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// A binary wake signal.
///
/// Behaves like a semaphore capped at one permit: any number of
/// [`release`](Self::release) calls before an [`acquire`](Self::acquire)
/// collapse into a single wakeup.
pub(crate) struct Signal {
    /// Whether a permit is available.
    raised: Mutex<bool>,

    /// Condition variable used to wake the parked owner.
    condvar: Condvar,
}

impl Signal {
    /// Creates a lowered signal.
    pub(crate) fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until the signal is raised, then lowers it.
    ///
    /// The calling thread is suspended while waiting; it does not spin.
    pub(crate) fn acquire(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);

        while !*raised {
            raised = self
                .condvar
                .wait(raised)
                .unwrap_or_else(PoisonError::into_inner);
        }

        *raised = false;
    }

    /// Raises the signal and wakes the parked owner, if any.
    pub(crate) fn release(&self) {
        *self.raised.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.condvar.notify_one();
    }
}

/// Per-worker state: the worker's task queue, its wake signal and its stop
/// request.
///
/// The owning worker pops from the front of `tasks`; other workers steal
/// from the back.
pub(crate) struct WorkerSlot {
    /// Tasks assigned to this worker.
    pub(crate) tasks: ConcurrentDeque<Task>,

    /// Raised whenever a task is assigned, and once more on shutdown.
    signal: Signal,

    /// Set when the pool asks this worker to exit.
    stop: AtomicBool,
}

impl WorkerSlot {
    pub(crate) fn new() -> Self {
        Self {
            tasks: ConcurrentDeque::new(),
            signal: Signal::new(),
            stop: AtomicBool::new(false),
        }
    }

    /// Parks the worker until it is woken.
    pub(crate) fn park(&self) {
        self.signal.acquire();
    }

    /// Wakes the worker.
    pub(crate) fn unpark(&self) {
        self.signal.release();
    }

    /// Asks the worker to exit after its next wakeup and wakes it.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.signal.release();
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_releases_collapse_into_one_permit() {
        let signal = Signal::new();

        signal.release();
        signal.release();
        signal.acquire();

        assert!(!*signal.raised.lock().unwrap());
    }

    #[test]
    fn test_stop_request_wakes_parked_worker() {
        let slot = Arc::new(WorkerSlot::new());

        let parked = {
            let slot = slot.clone();
            thread::spawn(move || {
                slot.park();
                slot.stop_requested()
            })
        };

        slot.request_stop();
        assert!(parked.join().unwrap());
    }
}
