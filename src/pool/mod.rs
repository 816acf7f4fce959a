//! The thread pool.
//!
//! This module contains the scheduler itself:
//! - [`core`]: [`ThreadPool`], its shared state and the submission API,
//! - [`builder`]: [`PoolBuilder`] for configuring a pool,
//! - [`worker`]: the per-thread drain / steal / park loop,
//! - [`completion`]: task counters and the completion flag behind
//!   [`ThreadPool::wait_for_tasks`],
//! - [`context`]: the thread-local worker identity.

mod completion;
mod worker;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod core;
