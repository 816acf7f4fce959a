use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Result slot shared between a [`Completer`] and its [`TaskFuture`].
enum Slot<T> {
    /// The task has not finished yet.
    Pending,
    /// The task finished; the outcome has not been taken.
    Ready(Result<T, TaskError>),
    /// The outcome was handed out to the caller.
    Taken,
}

struct Promise<T> {
    slot: Mutex<Slot<T>>,

    /// Wakes threads blocked in [`TaskFuture::wait`].
    ready: Condvar,

    /// Waker of the last async poll, if any.
    waker: Mutex<Option<Waker>>,
}

impl<T> Promise<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected completer / future pair.
pub(crate) fn channel<T>() -> (Completer<T>, TaskFuture<T>) {
    let promise = Arc::new(Promise {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
        waker: Mutex::new(None),
    });

    (
        Completer {
            promise: promise.clone(),
            done: false,
        },
        TaskFuture { promise },
    )
}

/// The writing half of a task's result.
///
/// Dropping a completer without calling [`complete`](Self::complete)
/// resolves the future with [`TaskError::Rejected`], so a task that is
/// discarded before running never leaves its caller waiting forever.
pub(crate) struct Completer<T> {
    promise: Arc<Promise<T>>,
    done: bool,
}

impl<T> Completer<T> {
    /// Stores the outcome and wakes every waiter.
    pub(crate) fn complete(mut self, outcome: Result<T, TaskError>) {
        self.fulfill(outcome);
    }

    fn fulfill(&mut self, outcome: Result<T, TaskError>) {
        self.done = true;

        {
            let mut slot = self.promise.lock();
            *slot = Slot::Ready(outcome);
        }
        self.promise.ready.notify_all();

        let waker = self
            .promise
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.done {
            self.fulfill(Err(TaskError::Rejected));
        }
    }
}

/// A handle to the result of a task submitted with
/// [`ThreadPool::enqueue`](crate::ThreadPool::enqueue).
///
/// The result can be retrieved by blocking with [`wait`](Self::wait) or by
/// awaiting the handle, since `TaskFuture` implements [`Future`].
///
/// A panic inside the task is captured and reported as
/// [`TaskError::Panicked`]; the worker that ran it keeps serving tasks.
///
/// Dropping the handle does **not** cancel the task; it only discards the
/// ability to observe its result.
#[must_use = "dropping a TaskFuture discards the task's result"]
pub struct TaskFuture<T> {
    promise: Arc<Promise<T>>,
}

impl<T> TaskFuture<T> {
    /// Blocks the current thread until the task has finished and returns
    /// its outcome.
    pub fn wait(self) -> Result<T, TaskError> {
        let mut slot = self.promise.lock();

        loop {
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(outcome) => return outcome,
                Slot::Pending => {
                    *slot = Slot::Pending;
                    slot = self
                        .promise
                        .ready
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                // `wait` consumes the handle and `poll` only takes on Ready,
                // so a taken slot means a completed async poll happened first.
                Slot::Taken => panic!("TaskFuture result already taken"),
            }
        }
    }

    /// Blocks for at most `timeout` and reports whether the outcome is
    /// available.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let slot = self.promise.lock();
        let (slot, _) = self
            .promise
            .ready
            .wait_timeout_while(slot, timeout, |slot| matches!(slot, Slot::Pending))
            .unwrap_or_else(PoisonError::into_inner);

        !matches!(*slot, Slot::Pending)
    }

    /// Returns `true` once the task has finished.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.promise.lock(), Slot::Pending)
    }
}

impl<T> Future for TaskFuture<T> {
    type Output = Result<T, TaskError>;

    /// Polls the task's outcome.
    ///
    /// The waker is registered **before** re-checking the slot so that a
    /// completion racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.take_ready() {
            return Poll::Ready(outcome);
        }

        *self
            .promise
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cx.waker().clone());

        match self.take_ready() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T> TaskFuture<T> {
    fn take_ready(&self) -> Option<Result<T, TaskError>> {
        let mut slot = self.promise.lock();

        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => Some(outcome),
            Slot::Pending => {
                *slot = Slot::Pending;
                None
            }
            Slot::Taken => panic!("TaskFuture polled after completion"),
        }
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    #[test]
    fn test_dropped_completer_rejects() {
        let (completer, future) = channel::<u32>();

        drop(completer);

        assert!(future.is_ready());
        assert_eq!(future.wait(), Err(TaskError::Rejected));
    }

    #[test]
    fn test_complete_wakes_blocked_waiter() {
        let (completer, future) = channel();

        let waiter = thread::spawn(move || future.wait());
        thread::sleep(Duration::from_millis(20));
        completer.complete(Ok("value"));

        assert_eq!(waiter.join().unwrap(), Ok("value"));
    }

    #[test]
    fn test_wait_for_times_out_while_pending() {
        let (completer, future) = channel::<()>();

        assert!(!future.wait_for(Duration::from_millis(10)));
        completer.complete(Ok(()));
        assert!(future.wait_for(Duration::ZERO));
    }

    #[test]
    fn test_poll_after_completion_uses_registered_waker() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::task::Wake;

        struct Flag(AtomicBool);

        impl Wake for Flag {
            fn wake(self: Arc<Self>) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let flag = Arc::new(Flag(AtomicBool::new(false)));
        let waker = Waker::from(flag.clone());
        let mut cx = Context::from_waker(&waker);

        let (completer, mut future) = channel();
        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());

        completer.complete(Ok(3));
        assert!(flag.0.load(Ordering::SeqCst));
        assert_eq!(Pin::new(&mut future).poll(&mut cx), Poll::Ready(Ok(3)));
    }
}
