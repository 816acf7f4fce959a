use super::builder::PoolBuilder;
use super::completion::Counters;
use super::context::is_worker_of;
use super::worker::{InitHook, Worker};
use crate::task::{self, Invoke, PanicObserver, Task, TaskFuture};
use crate::work_stealing::deque::ConcurrentDeque;
use crate::work_stealing::slot::WorkerSlot;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::thread::{self, JoinHandle};

/// Spawns one worker thread. Replaceable so construction failures can be
/// exercised.
pub(crate) type Spawner =
    dyn FnMut(thread::Builder, Box<dyn FnOnce() + Send + 'static>) -> io::Result<JoinHandle<()>>;

/// State shared between the pool handle and its workers.
pub(crate) struct Shared {
    /// One slot per requested worker. Only the first `workers` slots ever
    /// belong to a live thread.
    pub(crate) slots: Vec<WorkerSlot>,

    /// Number of live workers, fixed once construction finishes.
    pub(crate) workers: AtomicUsize,

    /// Round-robin assignment ring holding the index of every live worker.
    pub(crate) ring: ConcurrentDeque<usize>,

    pub(crate) counters: Counters,

    /// Set once shutdown begins; later submissions are rejected.
    ///
    /// Submitters hold the read lock while pushing, so once the write lock
    /// has flipped the flag no push can still be in progress.
    closed: RwLock<bool>,
}

impl Shared {
    /// Assigns `task` to the worker at the front of the ring and wakes it.
    ///
    /// Returns the task back if it cannot be assigned.
    fn assign(&self, task: Task) -> Result<(), Task> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(task);
        }

        let Some(id) = self.ring.peek_front_and_rotate_to_back() else {
            return Err(task);
        };

        self.push_to(id, task);
        drop(closed);
        Ok(())
    }

    /// Rejects every later submission. Waits for pushes in progress.
    fn close(&self) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Identifies this pool in the thread-local worker context.
    pub(crate) fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// Number of live workers.
    pub(crate) fn workers(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }

    /// Pushes `task` onto worker `id`'s queue and raises its signal.
    pub(crate) fn push_to(&self, id: usize, task: Task) {
        self.counters.submitted();

        let slot = &self.slots[id];
        slot.tasks.push_back(task);
        slot.unpark();
    }
}

/// A fixed-size work-stealing thread pool.
///
/// The pool owns `N` worker threads, each paired with its own task deque
/// and wake signal. Submitted tasks are assigned round-robin: the worker
/// index at the front of an assignment ring receives the task and rotates
/// to the back. A woken worker drains its own queue oldest-first and then,
/// while tasks remain unassigned anywhere in the pool, steals from the tail
/// of its peers' queues.
///
/// Two submission modes are available:
/// - [`enqueue`](Self::enqueue) returns a [`TaskFuture`] carrying the
///   return value or the task's panic,
/// - [`enqueue_detach`](Self::enqueue_detach) discards both.
///
/// Dropping the pool waits for outstanding tasks, then stops and joins
/// every worker.
///
/// # Examples
///
/// ```rust
/// use isx_pool::ThreadPool;
///
/// let pool = ThreadPool::new(4);
///
/// let answer = pool.enqueue(|| 6 * 7);
/// assert_eq!(answer.wait(), Ok(42));
///
/// pool.enqueue_detach(|| println!("fire and forget"));
/// pool.wait_for_tasks();
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,

    /// Join handles for worker threads, drained on shutdown.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Observer for panics of detached tasks.
    on_detached_panic: Option<PanicObserver>,
}

impl ThreadPool {
    /// Creates a pool with `threads` workers and default settings.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn new(threads: usize) -> Self {
        PoolBuilder::new().worker_threads(threads).build()
    }

    /// Returns a [`PoolBuilder`] for configuring a pool.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Creates the pool and spawns its workers.
    ///
    /// A worker whose thread fails to spawn is skipped: its index is reused
    /// for the next attempt and never enters the ring, so the pool ends up
    /// with fewer workers instead of failing.
    pub(crate) fn spawn(
        threads: usize,
        name_prefix: &str,
        init: Option<InitHook>,
        pin_workers: bool,
        on_detached_panic: Option<PanicObserver>,
        spawner: &mut Spawner,
    ) -> Self {
        let shared = Arc::new(Shared {
            slots: (0..threads).map(|_| WorkerSlot::new()).collect(),
            workers: AtomicUsize::new(0),
            ring: ConcurrentDeque::new(),
            counters: Counters::new(),
            closed: RwLock::new(false),
        });

        let mut handles = Vec::with_capacity(threads);
        let mut current_id = 0;

        for attempt in 0..threads {
            let worker = Worker::new(current_id, shared.clone(), init.clone(), pin_workers);
            let builder = thread::Builder::new().name(format!("{name_prefix}-{current_id}"));

            match spawner(builder, Box::new(move || worker.run())) {
                Ok(handle) => {
                    shared.ring.push_back(current_id);
                    handles.push(handle);
                    current_id += 1;
                }
                Err(error) => {
                    tracing::warn!(worker = current_id, attempt, %error, "failed to spawn worker thread");
                }
            }
        }

        shared.workers.store(current_id, Ordering::Release);

        tracing::debug!(workers = current_id, requested = threads, "thread pool started");

        Self {
            shared,
            handles: Mutex::new(handles),
            on_detached_panic,
        }
    }

    /// Submits `f` and returns a future for its result.
    ///
    /// Submission never blocks on execution. If `f` panics, the panic is
    /// captured and the future resolves to [`TaskError::Panicked`]; the
    /// worker survives. After [`shutdown`](Self::shutdown), or when the pool
    /// has no live worker, the future resolves to [`TaskError::Rejected`].
    ///
    /// [`TaskError::Panicked`]: crate::TaskError::Panicked
    /// [`TaskError::Rejected`]: crate::TaskError::Rejected
    pub fn enqueue<F, R>(&self, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, future) = task::promised(f);

        if let Err(task) = self.shared.assign(task) {
            tracing::debug!("task rejected");
            drop(task);
        }

        future
    }

    /// Submits `f` bound to `args` and returns a future for its result.
    ///
    /// ```rust
    /// use isx_pool::ThreadPool;
    ///
    /// fn scale(value: u64, factor: u64) -> u64 {
    ///     value * factor
    /// }
    ///
    /// let pool = ThreadPool::new(2);
    /// assert_eq!(pool.enqueue_with(scale, (21, 2)).wait(), Ok(42));
    /// ```
    pub fn enqueue_with<F, Args>(&self, f: F, args: Args) -> TaskFuture<F::Output>
    where
        F: Invoke<Args>,
        Args: Send + 'static,
        F::Output: Send + 'static,
    {
        self.enqueue(move || f.invoke(args))
    }

    /// Submits `f`, discarding its return value.
    ///
    /// A panic in `f` is swallowed: it is reported to the observer installed
    /// with [`PoolBuilder::on_detached_panic`] if there is one, and otherwise
    /// has no observable effect. Submissions after shutdown are dropped.
    pub fn enqueue_detach<F, R>(&self, f: F)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        if !self.submit_detached(f) {
            tracing::debug!("detached task rejected");
        }
    }

    /// Submits `f` like [`enqueue_detach`](Self::enqueue_detach) and reports
    /// whether it was accepted.
    pub(crate) fn submit_detached<F, R>(&self, f: F) -> bool
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let task = task::detached(f, self.on_detached_panic.clone());
        self.shared.assign(task).is_ok()
    }

    /// Submits `f` bound to `args`, discarding its return value.
    pub fn enqueue_detach_with<F, Args>(&self, f: F, args: Args)
    where
        F: Invoke<Args>,
        Args: Send + 'static,
    {
        self.enqueue_detach(move || f.invoke(args))
    }

    /// Returns the number of live workers.
    ///
    /// Constant after construction; it is lower than requested only when
    /// some worker threads failed to spawn.
    pub fn size(&self) -> usize {
        self.shared.workers()
    }

    /// Number of tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.counters.in_flight.load(Ordering::Acquire)
    }

    /// Number of tasks submitted but not yet started.
    pub fn unassigned(&self) -> usize {
        self.shared.counters.unassigned.load(Ordering::Acquire)
    }

    /// Blocks until no task is in flight.
    ///
    /// Returns immediately when nothing is outstanding. This is a
    /// best-effort barrier: tasks submitted concurrently with the call may
    /// or may not be waited for.
    ///
    /// Must not be called from inside a task of this pool: the calling task
    /// is itself in flight.
    pub fn wait_for_tasks(&self) {
        self.shared.counters.wait_idle();
    }

    /// Waits for outstanding tasks, then stops and joins every worker in
    /// index order.
    ///
    /// Tasks running at that point finish normally; nothing is interrupted.
    /// Calling `shutdown` again, or dropping the pool afterwards, is a no-op;
    /// a call racing with a shutdown in progress returns once every worker
    /// has been joined.
    ///
    /// When called from one of the pool's own tasks, for instance because a
    /// task dropped the last handle, the pool is closed and every other
    /// worker is joined, but the calling worker is left to finish its queue
    /// and exit on its own.
    pub fn shutdown(&self) {
        if is_worker_of(self.shared.key()) {
            self.shutdown_from_worker();
            return;
        }

        self.wait_for_tasks();

        // Held until every worker is joined so concurrent callers wait.
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if handles.is_empty() {
            return;
        }

        self.shared.close();

        for (id, handle) in handles.drain(..).enumerate() {
            self.shared.slots[id].request_stop();

            if handle.join().is_err() {
                tracing::warn!(worker = id, "worker thread panicked");
            }
        }

        // Submissions that raced with the stop requests never ran; settle
        // them so their futures resolve and later waits return.
        for slot in &self.shared.slots {
            while let Some(task) = slot.tasks.try_pop_front() {
                drop(task);
                self.shared.counters.discarded();
            }
        }

        tracing::debug!(workers = self.shared.workers(), "thread pool shut down");
    }

    fn shutdown_from_worker(&self) {
        let mut handles = match self.handles.try_lock() {
            Ok(handles) => handles,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            // Another shutdown holds the handles and will join this thread.
            Err(TryLockError::WouldBlock) => return,
        };
        if handles.is_empty() {
            return;
        }

        self.shared.close();

        let current = thread::current().id();
        for slot in &self.shared.slots {
            slot.request_stop();
        }

        for (id, handle) in handles.drain(..).enumerate() {
            if handle.thread().id() == current {
                // Dropping the handle detaches this thread. Its loop still
                // picks up every queued task before it sees the stop request.
                continue;
            }

            if handle.join().is_err() {
                tracing::warn!(worker = id, "worker thread panicked");
            }
        }

        tracing::debug!(
            workers = self.shared.workers(),
            "thread pool shut down from one of its workers"
        );
    }
}

impl Drop for ThreadPool {
    /// Shuts the pool down, see [`ThreadPool::shutdown`].
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.size())
            .field("in_flight", &self.in_flight())
            .field("unassigned", &self.unassigned())
            .finish()
    }
}
