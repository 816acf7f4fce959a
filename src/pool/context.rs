use std::cell::Cell;

/// Identity of the pool worker running on a thread.
#[derive(Clone, Copy)]
struct WorkerContext {
    /// Key of the owning pool, see `Shared::key`.
    pool: usize,
    id: usize,
}

thread_local! {
    /// Set once when a worker thread starts and never cleared, since the
    /// thread exits together with its worker loop.
    static CURRENT_WORKER: Cell<Option<WorkerContext>> = const { Cell::new(None) };
}

/// Marks the current thread as worker `id` of the pool keyed `pool`.
pub(crate) fn enter_worker(pool: usize, id: usize) {
    CURRENT_WORKER.with(|current| current.set(Some(WorkerContext { pool, id })));
}

/// Returns `true` if the current thread is a worker of the pool keyed `pool`.
pub(crate) fn is_worker_of(pool: usize) -> bool {
    CURRENT_WORKER.with(|current| current.get().is_some_and(|cx| cx.pool == pool))
}

/// Returns the index of the pool worker executing the current thread.
///
/// Returns `None` when called from a thread that is not a pool worker.
/// Tasks can use this to tell which worker ran them, which is what makes
/// work stealing observable.
///
/// # Examples
///
/// ```rust
/// use isx_pool::{ThreadPool, current_worker_id};
///
/// let pool = ThreadPool::new(2);
/// let id = pool.enqueue(current_worker_id).wait().unwrap();
///
/// assert!(matches!(id, Some(0) | Some(1)));
/// assert_eq!(current_worker_id(), None);
/// ```
pub fn current_worker_id() -> Option<usize> {
    CURRENT_WORKER.with(|current| current.get().map(|cx| cx.id))
}
