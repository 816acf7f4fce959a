use super::context::enter_worker;
use super::core::Shared;
use crate::affinity;
use crate::error::panic_message;
use crate::task::Task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Per-thread initialization callback, called with the worker index.
pub(crate) type InitHook = Arc<dyn Fn(usize) + Send + Sync>;

/// A worker thread of the pool.
///
/// A `Worker` owns the slot with its index and cooperates with its peers
/// to balance load. Its loop moves through these states:
/// 1. Idle: parked on the slot's wake signal
/// 2. Draining: pops its own queue from the front until empty
/// 3. Stealing: while tasks are unassigned anywhere, takes one from the
///    tail of a peer's queue and goes back to draining
/// 4. Stopped: exits after a wakeup once a stop was requested
pub(crate) struct Worker {
    /// Index of the worker and of its slot.
    id: usize,

    shared: Arc<Shared>,

    /// Optional per-thread initialization hook.
    init: Option<InitHook>,

    /// Whether to pin the thread to a core before running.
    pin: bool,
}

impl Worker {
    pub(crate) fn new(id: usize, shared: Arc<Shared>, init: Option<InitHook>, pin: bool) -> Self {
        Self {
            id,
            shared,
            init,
            pin,
        }
    }

    /// Runs the worker loop until a stop is requested.
    pub(crate) fn run(self) {
        enter_worker(self.shared.key(), self.id);
        self.prepare_thread();

        tracing::debug!(worker = self.id, "worker started");

        let slot = &self.shared.slots[self.id];
        loop {
            slot.park();
            self.process_tasks();

            if slot.stop_requested() {
                break;
            }
        }

        tracing::debug!(worker = self.id, "worker stopped");
    }

    /// Applies core pinning and runs the init hook.
    ///
    /// Neither may keep the worker from entering its loop: failures are
    /// logged and otherwise ignored.
    fn prepare_thread(&self) {
        if self.pin {
            let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
            let core = self.id % cores;

            if let Err(error) = affinity::pin_current_thread(core) {
                tracing::warn!(worker = self.id, core, %error, "failed to pin worker thread");
            }
        }

        if let Some(init) = &self.init {
            let id = self.id;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| init(id))) {
                tracing::warn!(
                    worker = id,
                    panic = %panic_message(payload.as_ref()),
                    "worker init hook panicked"
                );
            }
        }
    }

    /// Drains the own queue, then steals while work is still unassigned.
    fn process_tasks(&self) {
        let own = &self.shared.slots[self.id].tasks;

        loop {
            while let Some(task) = own.try_pop_front() {
                self.execute(task);
            }

            if !self.steal() && self.shared.counters.has_unassigned() {
                // The remaining work is being pushed right now or sits in
                // a queue we just missed; give the pusher a chance.
                thread::yield_now();
            }

            if !self.shared.counters.has_unassigned() {
                break;
            }
        }
    }

    /// Attempts to steal and run one task from a peer.
    ///
    /// Peers are visited in ring order starting right after this worker,
    /// taking from the tail of their queue. Returns whether a task ran.
    fn steal(&self) -> bool {
        let workers = self.shared.workers();

        for offset in 1..workers {
            let victim = (self.id + offset) % workers;

            if let Some(task) = self.shared.slots[victim].tasks.try_pop_back() {
                tracing::trace!(worker = self.id, victim, "stole task");
                self.execute(task);
                return true;
            }
        }

        false
    }

    /// Runs a task and updates the pool's counters around it.
    fn execute(&self, task: Task) {
        self.shared.counters.started();
        task.run();
        self.shared.counters.finished();
    }
}
