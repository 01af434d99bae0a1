//! Worker loop bound to one OS thread.
//!
//! A [`Minion`] repeatedly extracts handles from the shared queue, hands
//! them to the user dispatcher, and routes reusable jobs through the pool's
//! post-dispatch closure. While a handle is being dispatched it is published
//! as the minion's `current` job so revokers can wait for completion.
//!
//! The completion wait uses a condition variable over `(current, interest)`:
//! the worker clears `current` and broadcasts, then holds its loop until
//! every registered waiter has decremented `interest`. That final drain is
//! what prevents a waiter from observing "still running" after the job has
//! in fact finished.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::core::dispatch::{DispatchHandle, Dispatcher};
use crate::core::pool::PoolShared;

/// Result of a completion wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionWait {
    /// The job was running here and has completed.
    Completed,
    /// The job was running here and did not complete within the deadline.
    TimedOut,
    /// This minion is not dispatching the job.
    NotRunning,
}

struct CurrentJob {
    handle: Option<DispatchHandle>,
    /// Number of threads waiting for the running job to complete.
    interest: usize,
}

pub(crate) struct Minion {
    current: Mutex<CurrentJob>,
    signal: Condvar,
    runs: AtomicU32,
}

impl Minion {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(CurrentJob {
                handle: None,
                interest: 0,
            }),
            signal: Condvar::new(),
            runs: AtomicU32::new(0),
        }
    }

    /// Number of handles this minion has dispatched.
    pub(crate) fn runs(&self) -> u32 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Whether a dispatch is in flight right now.
    pub(crate) fn is_active(&self) -> bool {
        self.current.lock().handle.is_some()
    }

    /// Wait until the given job, if it is the one currently dispatching
    /// here, has completed.
    pub(crate) fn completed(&self, job: &DispatchHandle, timeout: Duration) -> CompletionWait {
        let deadline = Instant::now() + timeout;
        let mut current = self.current.lock();

        if current.handle.as_ref() != Some(job) {
            return CompletionWait::NotRunning;
        }

        current.interest += 1;
        let mut result = CompletionWait::Completed;
        while current.handle.as_ref() == Some(job) {
            if self.signal.wait_until(&mut current, deadline).timed_out() {
                if current.handle.as_ref() == Some(job) {
                    result = CompletionWait::TimedOut;
                }
                break;
            }
        }
        current.interest -= 1;
        // Let the worker (and fellow waiters) re-examine the interest count.
        self.signal.notify_all();
        result
    }

    /// The worker thread body: drain the queue until it reports shutdown.
    pub(crate) fn process(&self, shared: &PoolShared) {
        shared.dispatcher().initialize();
        debug!("worker entering dispatch loop");

        while let Some(entry) = shared.queue().extract(None) {
            self.current.lock().handle = Some(entry.handle.clone());
            self.runs.fetch_add(1, Ordering::Relaxed);

            let waited = entry.queued_at.elapsed();
            let started = Instant::now();
            shared.dispatcher().dispatch(&entry.handle);
            trace!(
                queued_us = waited.as_micros() as u64,
                dispatch_us = started.elapsed().as_micros() as u64,
                "dispatched one handle"
            );

            // Reusable jobs may want another round, decided under the queue
            // lock so a racing revoker cannot slip between the state
            // transition and the enqueue.
            if let Some(job) = entry.handle.reusable() {
                shared.closure(&entry.handle, job.as_ref());
            }

            let mut current = self.current.lock();
            current.handle = None;
            if current.interest > 0 {
                self.signal.notify_all();
                while current.interest > 0 {
                    self.signal.wait(&mut current);
                }
            }
        }

        debug!("worker leaving dispatch loop");
        shared.dispatcher().deinitialize();
    }
}
