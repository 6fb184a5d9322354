//! Blocking MPMC queue for in-process (inter-thread) communication.
//!
//! An unbounded FIFO queue backed by a mutex-guarded linked list, with a
//! condition variable to park consumers while the queue is empty.
//!
//! # Overview
//!
//! - [`Queue`] - Cloneable handle; every clone operates on the same queue,
//!   with any number of producers and consumers
//! - Blocking [`Queue::pop`], deadline-bounded [`Queue::pop_timeout`],
//!   non-blocking [`Queue::try_push`] and [`Queue::try_pop`]
//! - Unbounded: [`Queue::push`] waits only for the lock, never for capacity
//!
//! # Example
//!
//! ```
//! use waitline::sync::mpmc;
//!
//! let queue = mpmc::Queue::new();
//! let consumer = queue.clone();
//!
//! // Producer thread
//! queue.push(42);
//!
//! // Consumer thread (blocks until an element is available)
//! assert_eq!(consumer.pop(), 42);
//! ```
//!
//! # Blocking discipline
//!
//! A consumer in [`Queue::pop`] re-checks for an element every time it wakes
//! and goes back to sleep if another consumer got there first, so spurious
//! wakeups are harmless. Producers broadcast on the empty-to-non-empty
//! transition only: a consumer never suspends without first observing the
//! queue empty under the lock, which means the queue stays empty until the
//! next push, and that push is the one that broadcasts. Pushes onto a
//! non-empty queue touch no condition variable at all.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use minstant::Instant;
use thiserror::Error;

use crate::fifo::list::{List, Node};
use crate::trace::{debug, trace};

/// Error returned by [`Queue::try_push`] when the queue lock is contended.
///
/// Carries the rejected value back to the caller so it can retry without
/// cloning.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("queue lock contended")]
pub struct TryPushError<T>(pub T);

impl<T> TryPushError<T> {
    /// Consumes the error, returning the value that was not enqueued.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Queue state shared by every handle.
struct Shared<T> {
    /// All queue state lives behind this lock. Every operation, including
    /// [`Queue::len`], goes through it.
    list: Mutex<List<T>>,

    /// Waited on by consumers that found the list empty; broadcast by the
    /// push that makes it non-empty again.
    not_empty: Condvar,
}

/// Handle to a blocking MPMC FIFO queue.
///
/// Cloning is cheap and every clone refers to the same queue: values pushed
/// through any handle come out of pops through any other handle, first in,
/// first out. Elements pushed by one thread pop in push order; elements from
/// different producers interleave in lock-acquisition order.
///
/// # Thread Safety
///
/// `Queue<T>` is [`Send`] and [`Sync`] for `T: Send`. Share clones across as
/// many producer and consumer threads as needed; all access serializes
/// through one internal mutex.
///
/// Dropping the last handle frees any elements still queued.
pub struct Queue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Queue<T> {
    /// Creates a new empty queue.
    ///
    /// Construction cannot fail: the lock and condition variable have no
    /// fallible initialization, and nodes are allocated per push.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                list: Mutex::new(List::new()),
                not_empty: Condvar::new(),
            }),
        }
    }

    /// Appends `value` at the tail, waiting for the lock if a concurrent
    /// operation holds it.
    ///
    /// Never waits for capacity. If the queue was empty, wakes every thread
    /// blocked in [`Queue::pop`] or [`Queue::pop_timeout`].
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding it); the queue state can no longer be trusted.
    pub fn push(&self, value: T) {
        // Allocate before taking the lock so the critical section stays at
        // pointer-relink length.
        let node = Box::new(Node::new(value));
        let mut list = self.lock();
        list.push_node(node);
        self.wake_if_first(&list);
    }

    /// Attempts to push without waiting for the lock.
    ///
    /// Otherwise identical to [`Queue::push`]. The queue is unbounded, so
    /// the lock is the only thing a push can wait on; this is the
    /// non-blocking mirror of [`Queue::try_pop`].
    ///
    /// # Errors
    ///
    /// Returns `Err(TryPushError(value))` if another thread holds the lock,
    /// handing the value back for retry. Nothing is enqueued or allocated in
    /// that case.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        let mut list = match self.shared.list.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(TryPushError(value)),
            Err(TryLockError::Poisoned(_)) => panic!("queue mutex poisoned"),
        };
        // The node is allocated only once the lock is held; a contended
        // attempt returns without touching the allocator.
        list.push_back(value);
        self.wake_if_first(&list);
        Ok(())
    }

    /// Removes and returns the head element, blocking until one is
    /// available.
    ///
    /// There is no timeout and no cancellation; use [`Queue::pop_timeout`]
    /// or [`Queue::try_pop`] when indefinite blocking is not acceptable.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn pop(&self) -> T {
        let mut list = self.lock();
        loop {
            if let Some(value) = list.pop_front() {
                return value;
            }
            trace!("pop: queue empty, suspending");
            // Waiting releases the lock until the wakeup re-acquires it.
            // Another consumer may drain the new element first, hence the
            // re-check on every iteration.
            list = self
                .shared
                .not_empty
                .wait(list)
                .expect("queue mutex poisoned");
        }
    }

    /// Removes and returns the head element, blocking at most `timeout`.
    ///
    /// Returns `None` if the deadline passes with the queue still empty.
    /// The deadline is computed once at entry, so wakeups that lose the
    /// race to another consumer do not extend the wait.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut list = self.lock();
        loop {
            if let Some(value) = list.pop_front() {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("pop_timeout: deadline expired with queue empty");
                return None;
            }
            let (guard, _) = self
                .shared
                .not_empty
                .wait_timeout(list, deadline.duration_since(now))
                .expect("queue mutex poisoned");
            list = guard;
        }
    }

    /// Attempts to pop without waiting.
    ///
    /// Returns `None` both when the queue is empty and when another thread
    /// holds the lock; the two cases are indistinguishable to the caller.
    /// Never touches the condition variable.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        let mut list = match self.shared.list.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return None,
            Err(TryLockError::Poisoned(_)) => panic!("queue mutex poisoned"),
        };
        list.pop_front()
    }

    /// Number of elements currently queued.
    ///
    /// Reads under the lock, so the count is exact at some instant during
    /// the call; with live producers and consumers it may be stale by the
    /// time the caller acts on it. Suitable for monitoring, not for
    /// predicting whether the next [`Queue::pop`] will block.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue held no elements at the instant of the check.
    ///
    /// Same snapshot semantics as [`Queue::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Acquires the state lock, waiting if contended.
    fn lock(&self) -> MutexGuard<'_, List<T>> {
        self.shared.list.lock().expect("queue mutex poisoned")
    }

    /// Broadcasts to parked consumers when `list` just became non-empty.
    ///
    /// Called with the lock held, immediately after a push. `len() == 1`
    /// identifies the empty-to-non-empty transition; see the module docs
    /// for why later pushes can skip the broadcast.
    fn wake_if_first(&self, list: &List<T>) {
        if list.len() == 1 {
            trace!("push: queue became non-empty, waking consumers");
            self.shared.not_empty.notify_all();
        }
    }
}

// Manual impl: a handle clone must not require T: Clone.
impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_basic_push_pop() {
        let queue = Queue::new();

        queue.push(42u64);
        assert_eq!(queue.pop(), 42);
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_fifo_order() {
        let queue = Queue::new();

        for i in 0..10u64 {
            queue.push(i);
        }

        for i in 0..10u64 {
            assert_eq!(queue.pop(), i);
        }

        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_blocking_and_try_pop_mix() {
        let queue = Queue::new();

        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), 2);

        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_empty_returns_immediately() {
        let queue: Queue<u64> = Queue::default();

        let start = std::time::Instant::now();
        assert_eq!(queue.try_pop(), None);
        // Bounded time: an empty try_pop must not touch the condition wait.
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_ops_fail_while_lock_held() {
        let queue = Queue::new();
        queue.push(1u64);

        {
            let _guard = queue.shared.list.lock().unwrap();

            // try_lock on a held mutex does not wait, even from the owning
            // thread.
            assert_eq!(queue.try_pop(), None);
            assert_eq!(queue.try_push(2), Err(TryPushError(2)));
        }

        // Lock released: both sides work again and nothing was enqueued by
        // the failed attempt.
        assert_eq!(queue.try_push(3), Ok(()));
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_try_push_returns_rejected_value() {
        let queue = Queue::new();
        let _guard = queue.shared.list.lock().unwrap();

        let err = queue.try_push("hello".to_string()).unwrap_err();
        assert_eq!(err.into_inner(), "hello");
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Queue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || queue.pop());

        // Give the consumer time to park before the push.
        thread::sleep(Duration::from_millis(50));
        producer.push(7u64);

        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn test_pop_timeout_expires_empty() {
        let queue: Queue<u64> = Queue::new();
        let timeout = Duration::from_millis(50);

        let start = std::time::Instant::now();
        assert_eq!(queue.pop_timeout(timeout), None);
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn test_pop_timeout_receives_value() {
        let queue = Queue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(9u64);
        });

        assert_eq!(queue.pop_timeout(Duration::from_secs(5)), Some(9));
        handle.join().unwrap();
    }

    #[test]
    fn test_pop_timeout_zero_is_immediate() {
        let queue: Queue<u64> = Queue::new();

        assert_eq!(queue.pop_timeout(Duration::ZERO), None);

        queue.push(1);
        assert_eq!(queue.pop_timeout(Duration::ZERO), Some(1));
    }

    #[test]
    fn test_clone_shares_queue() {
        let queue = Queue::new();
        let other = queue.clone();

        queue.push(1u64);
        other.push(2);

        assert_eq!(other.len(), 2);
        assert_eq!(other.pop(), 1);
        assert_eq!(queue.pop(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_send_to_thread() {
        let queue = Queue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            for i in 0..10u64 {
                producer.push(i);
            }
        });

        handle.join().unwrap();

        for i in 0..10u64 {
            assert_eq!(queue.pop(), i);
        }
    }

    #[test]
    fn test_non_copy_type() {
        let queue = Queue::new();

        queue.push("hello".to_string());
        queue.push("world".to_string());

        assert_eq!(queue.pop(), "hello");
        assert_eq!(queue.try_pop(), Some("world".to_string()));
        assert_eq!(queue.try_pop(), None);
    }

    // Ensure handles can be shared across producer and consumer threads
    fn _assert_send_sync<Q: Send + Sync>() {}

    #[test]
    fn test_queue_is_send_and_sync() {
        _assert_send_sync::<Queue<u64>>();
        _assert_send_sync::<Queue<String>>();
        _assert_send_sync::<Queue<Vec<Box<[u8]>>>>();
    }
}
