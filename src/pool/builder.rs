use super::core::ThreadPool;
use super::worker::InitHook;
use crate::config::ThreadPoolConfig;
use crate::error::TaskError;
use crate::task::PanicObserver;

use std::sync::Arc;
use std::thread;

/// Default prefix for worker thread names.
const DEFAULT_THREAD_NAME: &str = "isx-worker";

/// Builder for configuring and creating a [`ThreadPool`].
///
/// # Examples
///
/// ```rust
/// use isx_pool::ThreadPool;
///
/// let pool = ThreadPool::builder()
///     .worker_threads(4)
///     .thread_name("render")
///     .on_thread_start(|id| println!("worker {id} up"))
///     .build();
///
/// assert_eq!(pool.size(), 4);
/// ```
pub struct PoolBuilder {
    /// Number of worker threads to spawn.
    worker_threads: usize,

    /// Worker threads are named `{thread_name}-{index}`.
    thread_name: String,

    /// Called once on every worker thread before it enters its loop.
    on_thread_start: Option<InitHook>,

    /// Pin worker `i` to core `i % cores`.
    pin_workers: bool,

    /// Receives the failures of detached tasks.
    on_detached_panic: Option<PanicObserver>,
}

impl PoolBuilder {
    /// Creates a new `PoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            on_thread_start: None,
            pin_workers: false,
            on_detached_panic: None,
        }
    }

    /// Creates a builder sized from a loaded configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_working_threads == 0`.
    pub fn from_config(config: &ThreadPoolConfig) -> Self {
        Self::new().worker_threads(config.max_working_threads)
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix used to name worker threads.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Installs a callback run once on each worker thread, with the worker
    /// index, before the worker starts taking tasks.
    ///
    /// A panic in the callback is caught and logged; the worker starts
    /// regardless.
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Pins each worker thread to a CPU core.
    ///
    /// Pinning failures, including platforms without affinity support, are
    /// logged and ignored.
    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.pin_workers = pin;
        self
    }

    /// Installs an observer for panics of tasks submitted with
    /// [`ThreadPool::enqueue_detach`].
    ///
    /// Without an observer those panics are discarded.
    pub fn on_detached_panic<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskError) + Send + Sync + 'static,
    {
        self.on_detached_panic = Some(Arc::new(f));
        self
    }

    /// Builds the pool, spawning every worker thread.
    ///
    /// Workers whose thread cannot be spawned are left out; check
    /// [`ThreadPool::size`] for the live count.
    pub fn build(self) -> ThreadPool {
        ThreadPool::spawn(
            self.worker_threads,
            &self.thread_name,
            self.on_thread_start,
            self.pin_workers,
            self.on_detached_panic,
            &mut |builder: thread::Builder, body: Box<dyn FnOnce() + Send + 'static>| {
                builder.spawn(body)
            },
        )
    }
}

impl Default for PoolBuilder {
    /// Creates a default `PoolBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
