//! Task primitives.
//!
//! This module defines how submitted callables become schedulable work:
//! - [`core`]: the type-erased [`Task`], argument binding through
//!   [`Invoke`], and the promised / detached task factories,
//! - [`handle`]: [`TaskFuture`], the result handle returned by
//!   [`ThreadPool::enqueue`](crate::ThreadPool::enqueue).

pub(crate) mod core;
pub(crate) mod handle;

pub(crate) use self::core::{PanicObserver, Task, detached, promised};

pub use self::core::Invoke;
pub use handle::TaskFuture;
