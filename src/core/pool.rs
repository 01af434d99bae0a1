//! Pool facade: executors, the shared queue, and the optional scheduler.

use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::ThreadPoolConfig;
use crate::core::dispatch::{DispatchHandle, Dispatcher, ReusableJob, Scheduler};
use crate::core::error::PoolError;
use crate::core::executor::Executor;
use crate::core::minion::CompletionWait;
use crate::core::queue::WorkQueue;

/// Predicate answering "is the calling thread one that must never block?".
pub type NonBlockingProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// State shared between the facade and every worker thread.
pub(crate) struct PoolShared {
    queue: WorkQueue,
    dispatcher: Arc<dyn Dispatcher>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl PoolShared {
    pub(crate) fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub(crate) fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    /// Post-dispatch hook for reusable jobs: consult the job's state machine
    /// and either re-enqueue immediately or hand off to the scheduler.
    ///
    /// Runs entirely under the queue's external lock. That pins the decision
    /// against a concurrent revoker: once `resubmit` emits a handle, nothing
    /// can remove it until it is actually enqueued.
    pub(crate) fn closure(&self, handle: &DispatchHandle, job: &dyn ReusableJob) {
        let mut queue = self.queue.lock();
        if let Some((next, when)) = job.resubmit() {
            match (&self.scheduler, when) {
                (Some(scheduler), Some(when)) if when > Instant::now() => {
                    scheduler.schedule(when, next);
                }
                _ => {
                    if queue.post(next).is_err() {
                        // Shutdown raced the re-run; the entry is dropped.
                        warn!(?handle, "dropping resubmission, queue disabled");
                    }
                }
            }
        }
    }
}

/// A fixed set of worker threads consuming dispatch handles from a shared
/// bounded queue.
///
/// ```
/// use std::time::Duration;
/// use dispatch_pool::{Dispatch, DispatchHandle, DirectDispatcher, ThreadPool, ThreadPoolConfig};
///
/// struct Greet;
/// impl Dispatch for Greet {
///     fn dispatch(&self) {}
/// }
///
/// let pool = ThreadPool::new(
///     ThreadPoolConfig::new().with_worker_count(2).with_queue_capacity(8),
///     std::sync::Arc::new(DirectDispatcher),
///     None,
/// ).unwrap();
///
/// pool.run();
/// pool.submit(DispatchHandle::new(Greet), Duration::from_secs(1)).unwrap();
/// pool.stop();
/// ```
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    units: Vec<Executor>,
    config: ThreadPoolConfig,
    nonblocking_caller: Option<NonBlockingProbe>,
}

impl ThreadPool {
    /// Create a pool with `config.worker_count` executor slots sharing one
    /// queue, one dispatcher, and an optional scheduler. Workers do not run
    /// until [`run`](Self::run).
    pub fn new(
        config: ThreadPoolConfig,
        dispatcher: Arc<dyn Dispatcher>,
        scheduler: Option<Arc<dyn Scheduler>>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shared = Arc::new(PoolShared {
            queue: WorkQueue::new(config.queue_capacity),
            dispatcher,
            scheduler,
        });
        let units = (0..config.worker_count).map(|_| Executor::new()).collect();

        Ok(Self {
            shared,
            units,
            config,
            nonblocking_caller: None,
        })
    }

    /// Install the probe identifying callers that must never block in
    /// [`submit`](Self::submit) (an event loop thread, typically). When the
    /// probe answers `true`, submission uses the non-blocking post path.
    #[must_use]
    pub fn with_nonblocking_caller(
        mut self,
        probe: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.nonblocking_caller = Some(Arc::new(probe));
        self
    }

    /// Enable the queue and start all workers.
    pub fn run(&self) {
        self.shared.queue.enable();
        for (index, unit) in self.units.iter().enumerate() {
            let name = format!("{}-{index}", self.config.thread_name);
            unit.start(
                Arc::clone(&self.shared),
                name,
                self.config.thread_stack_size,
            );
        }
        info!(
            worker_count = self.units.len(),
            queue_capacity = self.config.queue_capacity,
            "thread pool running"
        );
    }

    /// Disable the queue, wake everything blocked on it, and join all
    /// workers. Entries accepted before the stop are drained first.
    pub fn stop(&self) {
        self.shared.queue.disable();
        for unit in &self.units {
            unit.join();
        }
        info!("thread pool stopped");
    }

    /// Enqueue a handle for dispatch.
    ///
    /// Callers for which the configured non-blocking probe answers `true`
    /// post without waiting; everyone else blocks up to `timeout` for queue
    /// space. A handle already queued is left alone and reported as success;
    /// the queue never holds two entries with the same identity.
    pub fn submit(&self, handle: DispatchHandle, timeout: Duration) -> Result<(), PoolError> {
        let nonblocking = self.nonblocking_caller.as_ref().is_some_and(|probe| probe());
        if nonblocking {
            self.shared.queue.post(handle)
        } else {
            self.shared.queue.insert(handle, timeout)
        }
    }

    /// Synchronously take a job out of the pool.
    ///
    /// A still-queued job is removed immediately. A job being dispatched is
    /// waited on for up to `timeout`; on success no worker is running it
    /// anymore. Revoking from inside the job's own dispatch returns `Ok`
    /// without waiting, so a job may revoke itself without deadlocking.
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] when the dispatch did not finish in time,
    /// [`PoolError::NotFound`] when the job is neither queued nor running.
    pub fn revoke(&self, handle: &DispatchHandle, timeout: Duration) -> Result<(), PoolError> {
        if self.shared.queue.remove(handle) {
            return Ok(());
        }

        let caller = thread::current().id();
        for unit in &self.units {
            if unit.thread_id() == Some(caller) {
                // Revoking the job we are running ourselves; waiting would
                // deadlock.
                return Ok(());
            }
            match unit.minion().completed(handle, timeout) {
                CompletionWait::Completed => return Ok(()),
                CompletionWait::TimedOut => return Err(PoolError::Timeout),
                CompletionWait::NotRunning => {}
            }
        }

        Err(PoolError::NotFound)
    }

    /// Number of worker slots.
    pub fn count(&self) -> usize {
        self.units.len()
    }

    /// Number of handles waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Number of workers currently dispatching.
    pub fn active(&self) -> usize {
        self.units.iter().filter(|u| u.is_active()).count()
    }

    /// Per-worker dispatch counters, in slot order.
    pub fn runs(&self) -> Vec<u32> {
        self.units.iter().map(Executor::runs).collect()
    }

    /// Thread identity of the given worker slot, when it is running.
    pub fn id(&self, index: usize) -> Option<ThreadId> {
        self.units.get(index).and_then(Executor::thread_id)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}
