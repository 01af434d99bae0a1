//! Bounded work queue shared by producers and workers.
//!
//! A FIFO channel of [`DispatchHandle`]s with blocking insert and blocking
//! extract, built on a `parking_lot` mutex and two condition variables (one
//! for space, one for availability). On top of the channel operations the
//! queue supports what a plain channel cannot: identity-based membership and
//! removal, enable/disable with mandatory wake-up of all blocked parties,
//! and an external scoped lock ([`QueueGuard`]) that pins the queue while a
//! caller combines a mutation with extra bookkeeping.
//!
//! Entries remember their enqueue instant so workers can report how long a
//! handle sat in the queue before running.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::dispatch::DispatchHandle;
use crate::core::error::PoolError;

/// One queued handle plus the instant it entered the queue.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// The handle to dispatch.
    pub handle: DispatchHandle,
    /// When the handle was enqueued.
    pub queued_at: Instant,
}

struct QueueState {
    entries: VecDeque<Extracted>,
    enabled: bool,
}

impl QueueState {
    fn position(&self, handle: &DispatchHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.handle == *handle)
    }

    /// Append unless the identical handle is already queued. A handle is
    /// never represented by two entries at once.
    fn push(&mut self, handle: DispatchHandle) -> bool {
        if self.position(&handle).is_some() {
            return false;
        }
        self.entries.push_back(Extracted {
            handle,
            queued_at: Instant::now(),
        });
        true
    }
}

/// Bounded FIFO of dispatch handles.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    /// Signalled when an entry is appended or the queue is disabled.
    available: Condvar,
    /// Signalled when an entry leaves the queue or the queue is disabled.
    space: Condvar,
    capacity: usize,
}

impl WorkQueue {
    /// Create a queue with the given capacity. The queue starts disabled;
    /// call [`enable`](Self::enable) before producing into it.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            state: Mutex::new(QueueState {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                enabled: false,
            }),
            available: Condvar::new(),
            space: Condvar::new(),
            capacity,
        }
    }

    /// Non-blocking enqueue at the tail.
    ///
    /// Used by callers that must never block (workers re-enqueueing under
    /// the queue guard, producers on a non-blocking thread), so it may
    /// transiently exceed the configured capacity. Fails only when the queue
    /// is disabled.
    pub fn post(&self, handle: DispatchHandle) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        if !state.enabled {
            return Err(PoolError::Disabled);
        }
        if state.push(handle) {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Blocking enqueue at the tail, waiting up to `timeout` for space. A
    /// handle that is already queued needs no space and returns success
    /// without waiting.
    pub fn insert(&self, handle: DispatchHandle, timeout: Duration) -> Result<(), PoolError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        while state.enabled
            && state.entries.len() >= self.capacity
            && state.position(&handle).is_none()
        {
            if self.space.wait_until(&mut state, deadline).timed_out() {
                return Err(PoolError::Timeout);
            }
        }
        if !state.enabled {
            return Err(PoolError::Disabled);
        }
        if state.push(handle) {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Blocking dequeue from the head. `None` as timeout waits forever.
    ///
    /// Returns `None` once the queue is disabled *and* empty; entries
    /// accepted before a disable are still handed out, so consumers drain
    /// the queue before observing shutdown.
    pub fn extract(&self, timeout: Option<Duration>) -> Option<Extracted> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();

        while state.enabled && state.entries.is_empty() {
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.available.wait(&mut state),
            }
        }

        let entry = state.entries.pop_front();
        if entry.is_some() {
            self.space.notify_one();
        }
        entry
    }

    /// Remove the first entry matching `handle` by identity.
    pub fn remove(&self, handle: &DispatchHandle) -> bool {
        let mut state = self.state.lock();
        match state.position(handle) {
            Some(index) => {
                state.entries.remove(index);
                self.space.notify_one();
                true
            }
            None => false,
        }
    }

    /// Identity-based membership test.
    pub fn has_entry(&self, handle: &DispatchHandle) -> bool {
        self.state.lock().position(handle).is_some()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allow producers and consumers in.
    pub fn enable(&self) {
        self.state.lock().enabled = true;
    }

    /// Refuse new entries and wake everything blocked on the queue.
    /// Producers observe [`PoolError::Disabled`]; consumers drain what is
    /// left and then observe `None`.
    pub fn disable(&self) {
        let mut state = self.state.lock();
        state.enabled = false;
        self.available.notify_all();
        self.space.notify_all();
    }

    /// Pin the queue for a composite operation. While the guard lives, no
    /// other thread can mutate the queue; the guard re-exposes the
    /// non-blocking operations so the caller can combine them with its own
    /// bookkeeping atomically.
    pub fn lock(&self) -> QueueGuard<'_> {
        QueueGuard {
            queue: self,
            state: self.state.lock(),
        }
    }
}

/// Scoped external lock over a [`WorkQueue`].
pub struct QueueGuard<'a> {
    queue: &'a WorkQueue,
    state: MutexGuard<'a, QueueState>,
}

impl QueueGuard<'_> {
    /// Non-blocking enqueue, same semantics as [`WorkQueue::post`].
    pub fn post(&mut self, handle: DispatchHandle) -> Result<(), PoolError> {
        if !self.state.enabled {
            return Err(PoolError::Disabled);
        }
        if self.state.push(handle) {
            self.queue.available.notify_one();
        }
        Ok(())
    }

    /// Identity-based removal, same semantics as [`WorkQueue::remove`].
    pub fn remove(&mut self, handle: &DispatchHandle) -> bool {
        match self.state.position(handle) {
            Some(index) => {
                self.state.entries.remove(index);
                self.queue.space.notify_one();
                true
            }
            None => false,
        }
    }

    /// Identity-based membership test.
    pub fn has_entry(&self, handle: &DispatchHandle) -> bool {
        self.state.position(handle).is_some()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}
