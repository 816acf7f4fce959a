//! Work-stealing scheduler components.
//!
//! This module implements the data structures the pool uses to distribute
//! tasks across worker threads.
//!
//! It consists of:
//! - [`deque`]: the internally synchronized double-ended queue shared by
//!   the scheduler and the log pipeline,
//! - [`slot`]: per-worker state pairing a task deque with a wake signal.
//!
//! Owners work the front of their deque while thieves take the back, which
//! keeps the two ends of the queue mostly uncontended.

pub(crate) mod deque;
pub(crate) mod slot;
