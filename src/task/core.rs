use super::handle::{TaskFuture, channel};
use crate::error::TaskError;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with the failure of a detached task.
pub(crate) type PanicObserver = Arc<dyn Fn(&TaskError) + Send + Sync>;

/// A unit of work executed by a pool worker.
///
/// A `Task` is a type-erased, zero-argument operation built at submission
/// time. It is executed exactly once and then discarded. Every task built
/// by this module catches panics from the user callable, so running a task
/// never unwinds into the worker loop.
pub(crate) struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    fn new(job: impl FnOnce() + Send + 'static) -> Self {
        Self { job: Box::new(job) }
    }

    /// Executes the task, consuming it.
    pub(crate) fn run(self) {
        (self.job)()
    }
}

/// A callable that can be bound to a tuple of arguments at submission time.
///
/// `Invoke` is implemented for every `FnOnce` taking up to six arguments,
/// with the arguments packed in a tuple:
///
/// ```rust
/// use isx_pool::Invoke;
///
/// fn add(a: u32, b: u32) -> u32 {
///     a + b
/// }
///
/// assert_eq!(add.invoke((2, 3)), 5);
/// ```
pub trait Invoke<Args>: Send + 'static {
    /// The callable's return type.
    type Output;

    /// Calls `self` with the unpacked arguments.
    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Invoke<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Ret + Send + 'static,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn invoke(self, ($($arg,)*): ($($arg,)*)) -> Self::Output {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A);
impl_invoke!(A, B);
impl_invoke!(A, B, C);
impl_invoke!(A, B, C, D);
impl_invoke!(A, B, C, D, E);
impl_invoke!(A, B, C, D, E, F);

/// Wraps `job` into a task whose outcome is delivered through the returned
/// future.
///
/// The return value, or the captured panic, is stored in the future. If the
/// task is dropped without running, the future resolves to
/// [`TaskError::Rejected`].
pub(crate) fn promised<F, R>(job: F) -> (Task, TaskFuture<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (completer, future) = channel();

    let task = Task::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(TaskError::from_panic);
        completer.complete(outcome);
    });

    (task, future)
}

/// Wraps `job` into a task that discards its return value.
///
/// A panic is caught and handed to `observer` when one is installed;
/// otherwise it is dropped without a trace beyond a `trace!` event.
pub(crate) fn detached<F, R>(job: F, observer: Option<PanicObserver>) -> Task
where
    F: FnOnce() -> R + Send + 'static,
{
    Task::new(move || {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let error = TaskError::from_panic(payload);

            match observer {
                Some(observer) => {
                    // A panicking observer must not take the worker down either.
                    let _ = panic::catch_unwind(AssertUnwindSafe(|| observer(&error)));
                }
                None => tracing::trace!(%error, "detached task failed"),
            }
        }
    })
}
