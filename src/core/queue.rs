//! Bounded multi-producer/multi-consumer queue
//!
//! The transport under the async appender. Capacity 0 means unbounded.
//! Producers and consumers block on separate condition variables keyed to
//! the full/empty *transitions*: a consumer is signalled only when the queue
//! goes from empty to non-empty, a producer only when it goes from full to
//! non-full. Signalling on every operation instead causes wake storms under
//! load.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Inner<T> {
    fn is_full(&self) -> bool {
        self.capacity != 0 && self.items.len() >= self.capacity
    }
}

/// Blocking FIFO queue with a stop/resume lifecycle.
///
/// `stop` closes the push side and wakes every blocked waiter. Residual
/// elements can still be popped after a stop so consumers can drain; the
/// empty-side wait fails instead of blocking once stopped. `resume` reopens
/// the queue for producers.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    stopped: AtomicBool,
}

impl<T> BoundedQueue<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                capacity,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            stopped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Blocking push. Fails with the rejected value once the queue is
    /// stopped, otherwise waits until space frees.
    pub fn push(&self, value: T) -> std::result::Result<(), T> {
        self.push_deadline(value, None)
    }

    /// Push that gives up after `timeout` if no space frees.
    pub fn push_timeout(&self, value: T, timeout: Duration) -> std::result::Result<(), T> {
        self.push_deadline(value, Some(Instant::now() + timeout))
    }

    /// Non-blocking push. Fails if the queue is stopped, full, or its lock
    /// is held by someone else at this instant.
    pub fn try_push(&self, value: T) -> std::result::Result<(), T> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(value);
        }
        let Some(mut inner) = self.inner.try_lock() else {
            return Err(value);
        };
        if inner.is_full() {
            return Err(value);
        }
        let was_empty = inner.items.is_empty();
        inner.items.push_back(value);
        if was_empty {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Blocking pop. Returns `None` only when the queue is stopped and
    /// holds no residual elements.
    pub fn pop(&self) -> Option<T> {
        self.pop_deadline(None)
    }

    /// Pop that gives up after `timeout` if nothing arrives.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.pop_deadline(Some(Instant::now() + timeout))
    }

    /// Non-blocking pop. Residual elements are returned even when the
    /// queue is stopped.
    pub fn try_pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        self.take_front(&mut inner)
    }

    fn push_deadline(&self, value: T, deadline: Option<Instant>) -> std::result::Result<(), T> {
        let mut inner = self.inner.lock();
        loop {
            if self.stopped.load(Ordering::Acquire) {
                return Err(value);
            }
            if !inner.is_full() {
                break;
            }
            match deadline {
                Some(at) => {
                    if self.not_full.wait_until(&mut inner, at).timed_out() && inner.is_full() {
                        return Err(value);
                    }
                }
                None => self.not_full.wait(&mut inner),
            }
        }
        let was_empty = inner.items.is_empty();
        inner.items.push_back(value);
        if was_empty {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    fn pop_deadline(&self, deadline: Option<Instant>) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = self.take_front(&mut inner) {
                return Some(value);
            }
            if self.stopped.load(Ordering::Acquire) {
                return None;
            }
            match deadline {
                Some(at) => {
                    if self.not_empty.wait_until(&mut inner, at).timed_out()
                        && inner.items.is_empty()
                    {
                        return None;
                    }
                }
                None => self.not_empty.wait(&mut inner),
            }
        }
    }

    fn take_front(&self, inner: &mut Inner<T>) -> Option<T> {
        let was_full = inner.is_full();
        let value = inner.items.pop_front()?;
        if was_full {
            self.not_full.notify_one();
        }
        Some(value)
    }

    /// Close the push side and wake every blocked waiter. Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        // Serialize with waiters that are between their predicate check and
        // the wait, so the notification cannot be missed.
        drop(self.inner.lock());
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Reopen the queue after a `stop`.
    pub fn resume(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Change the capacity. Widening (or lifting the bound entirely) wakes
    /// every blocked producer.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity;
        if capacity == 0 || inner.items.len() < capacity {
            self.not_full.notify_all();
        }
    }

    /// Discard every queued element.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        self.not_full.notify_all();
    }
}
