use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An internally synchronized double-ended queue.
///
/// `ConcurrentDeque` can be pushed to and popped from at either end by any
/// number of threads without external locking. The pool uses it in three
/// places:
/// - as each worker's task queue, where the owner works the front and
///   thieves take from the back,
/// - as the round-robin assignment ring of worker indices,
/// - as the channel of the async log pipeline.
///
/// An element pushed at one end is visible to the next pop from that end.
/// No global FIFO order is promised when several producers push
/// concurrently.
pub struct ConcurrentDeque<T> {
    /// Inner deque protected by a mutex.
    inner: Mutex<VecDeque<T>>,
}

impl<T> ConcurrentDeque<T> {
    /// Creates an empty deque.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Pushes a value onto the back of the deque.
    pub fn push_back(&self, value: T) {
        self.lock().push_back(value);
    }

    /// Pushes a value onto the front of the deque.
    pub fn push_front(&self, value: T) {
        self.lock().push_front(value);
    }

    /// Removes the front element, or returns `None` if the deque is empty.
    pub fn try_pop_front(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes the back element, or returns `None` if the deque is empty.
    ///
    /// This is the end thieves take from.
    pub fn try_pop_back(&self) -> Option<T> {
        self.lock().pop_back()
    }

    /// Returns the number of queued elements at the time of the call.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the deque held no elements at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // No user code ever runs under this lock, so a poisoned guard still
        // holds a consistent deque.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> ConcurrentDeque<T> {
    /// Removes the front element and reinserts it at the back, returning a
    /// copy of it.
    ///
    /// Both steps happen under a single lock, so concurrent callers each
    /// observe a distinct front element and the length never changes. This
    /// is how the pool walks its assignment ring.
    pub fn peek_front_and_rotate_to_back(&self) -> Option<T> {
        let mut inner = self.lock();
        let front = inner.pop_front()?;
        inner.push_back(front.clone());
        Some(front)
    }
}

impl<T> Default for ConcurrentDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for ConcurrentDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T> std::fmt::Debug for ConcurrentDeque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentDeque")
            .field("len", &self.len())
            .finish()
    }
}
