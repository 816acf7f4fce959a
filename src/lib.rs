//! # isx-pool
//!
//! **isx-pool** is a work-stealing thread pool built on a small concurrent
//! double-ended queue.
//!
//! The pool coordinates a fixed set of worker threads. Each worker owns a
//! task deque and a wake signal; submitted tasks are handed out round-robin
//! and idle workers steal from the tail of busy peers' queues. It offers:
//!
//! - **Fire-and-forget** submission with [`ThreadPool::enqueue_detach`]
//! - **Future-returning** submission with [`ThreadPool::enqueue`], whose
//!   [`TaskFuture`] can be waited on or awaited
//! - **Panic isolation**: a panicking task never takes its worker down; the
//!   panic is delivered through the future as [`TaskError::Panicked`]
//! - A completion barrier, [`ThreadPool::wait_for_tasks`], and a teardown
//!   that drains outstanding work before joining every worker
//!
//! Around the scheduler live a few collaborators: an asynchronous
//! [`log`] pipeline reusing the same [`ConcurrentDeque`], a JSON
//! [`config`] loader and a CPU [`affinity`] helper.
//!
//! ## Quick Start
//!
//! ```rust
//! use isx_pool::ThreadPool;
//!
//! let pool = ThreadPool::new(4);
//!
//! let squares: Vec<_> = (0..8u64).map(|n| pool.enqueue(move || n * n)).collect();
//! let total: u64 = squares.into_iter().map(|f| f.wait().unwrap()).sum();
//! assert_eq!(total, 140);
//!
//! let failed = pool.enqueue(|| -> u32 { panic!("boom") });
//! assert!(failed.wait().is_err());
//! ```
//!
//! ## Modules
//!
//! - [`log`]: Asynchronous log pipeline
//! - [`config`]: JSON configuration loading
//! - [`affinity`]: Thread-to-core pinning
//! - [`error`]: Error types

mod pool;
mod task;
mod work_stealing;

pub mod affinity;
pub mod config;
pub mod error;
pub mod log;

pub use error::TaskError;
pub use pool::builder::PoolBuilder;
pub use pool::context::current_worker_id;
pub use pool::core::ThreadPool;
pub use task::{Invoke, TaskFuture};
pub use work_stealing::deque::ConcurrentDeque;
