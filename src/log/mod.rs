//! Asynchronous log pipeline.
//!
//! Producers on any thread push [`LogRecord`]s onto a shared
//! [`ConcurrentDeque`]; the pool drains it in the background through
//! detached tasks, at most one drain at a time, writing records to a
//! [`LogSink`] oldest-first.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use isx_pool::ThreadPool;
//! use isx_pool::config::LoggingConfig;
//! use isx_pool::log::{AsyncLogger, WriterSink};
//!
//! let pool = Arc::new(ThreadPool::new(2));
//! let logger = AsyncLogger::new(&LoggingConfig::default(), WriterSink::new(Vec::new()), pool);
//!
//! logger.debug("starting up");
//! logger.flush();
//! ```

mod record;
mod sink;

pub use record::{LogLevel, LogRecord, SeverityFilter};
pub use sink::{ConsoleSink, LogSink, WriterSink};

use crate::ThreadPool;
use crate::config::LoggingConfig;
use crate::work_stealing::deque::ConcurrentDeque;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

struct Inner {
    queue: ConcurrentDeque<LogRecord>,
    sink: Mutex<Box<dyn LogSink>>,
    filter: SeverityFilter,

    /// Flush the sink after every drained batch.
    flush: bool,

    /// Set while a drain task is scheduled or running.
    draining: AtomicBool,

    /// Live `AsyncLogger` handles. Drain tasks do not count.
    handles: AtomicUsize,
}

impl Inner {
    /// Writes every queued record to the sink.
    ///
    /// Records are popped while the sink lock is held, so concurrent drains
    /// cannot reorder them.
    fn drain(&self) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let mut written = false;

        while let Some(record) = self.queue.try_pop_front() {
            if let Err(error) = sink.write(&record) {
                tracing::warn!(%error, "failed to write log record");
            }
            written = true;
        }

        if written && self.flush {
            if let Err(error) = sink.flush() {
                tracing::warn!(%error, "failed to flush log sink");
            }
        }
    }

    /// Body of the background drain task.
    fn drain_scheduled(&self) {
        loop {
            self.drain();
            self.draining.store(false, Ordering::Release);

            // A record pushed after the last pop but before the flag was
            // cleared saw `draining == true` and scheduled nothing.
            if self.queue.is_empty() || self.draining.swap(true, Ordering::AcqRel) {
                break;
            }
        }
    }
}

/// Handle to an asynchronous log pipeline.
///
/// Cloning the handle shares the pipeline. Dropping the last handle drains
/// every queued record synchronously.
pub struct AsyncLogger {
    inner: Arc<Inner>,
    pool: Arc<ThreadPool>,
}

impl AsyncLogger {
    /// Creates a pipeline writing to `sink` and draining on `pool`.
    pub fn new(config: &LoggingConfig, sink: impl LogSink, pool: Arc<ThreadPool>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: ConcurrentDeque::new(),
                sink: Mutex::new(Box::new(sink)),
                filter: config.log_level,
                flush: config.flush,
                draining: AtomicBool::new(false),
                handles: AtomicUsize::new(1),
            }),
            pool,
        }
    }

    /// The severity filter applied on submission.
    pub fn filter(&self) -> SeverityFilter {
        self.inner.filter
    }

    /// Number of records queued but not yet written.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Queues a record if `level` passes the filter.
    ///
    /// Never blocks on the sink.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.inner.filter.allows(level) {
            return;
        }

        self.inner.queue.push_back(LogRecord::new(level, message));

        if !self.inner.draining.swap(true, Ordering::AcqRel) {
            let inner = self.inner.clone();

            if !self.pool.submit_detached(move || inner.drain_scheduled()) {
                // The pool is shut down: write on the caller's thread.
                self.inner.draining.store(false, Ordering::Release);
                self.inner.drain();
            }
        }
    }

    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[track_caller]
    pub fn prod(&self, message: impl Into<String>) {
        self.log(LogLevel::Prod, message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Writes every queued record on the calling thread and flushes the
    /// sink.
    pub fn flush(&self) {
        self.inner.drain();

        let mut sink = self.inner.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = sink.flush() {
            tracing::warn!(%error, "failed to flush log sink");
        }
    }
}

impl Clone for AsyncLogger {
    fn clone(&self) -> Self {
        self.inner.handles.fetch_add(1, Ordering::Relaxed);

        Self {
            inner: self.inner.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        if self.inner.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.flush();
        }
    }
}
