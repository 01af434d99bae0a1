//! OS-thread host for one minion.

use std::sync::Arc;
use std::thread::{Builder, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::minion::Minion;
use crate::core::pool::PoolShared;

/// Binds a [`Minion`] to an OS thread with a start/join lifecycle.
///
/// Slots are created up front by the pool and never move; the thread itself
/// exists only between [`start`](Self::start) and [`join`](Self::join), and
/// may be started again after a join. The slot is internally synchronized so
/// the pool can probe it (identity, activity) while another thread joins it.
pub(crate) struct Executor {
    minion: Arc<Minion>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
}

impl Executor {
    pub(crate) fn new() -> Self {
        Self {
            minion: Arc::new(Minion::new()),
            thread: Mutex::new(None),
            thread_id: Mutex::new(None),
        }
    }

    pub(crate) fn minion(&self) -> &Arc<Minion> {
        &self.minion
    }

    pub(crate) fn runs(&self) -> u32 {
        self.minion.runs()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.minion.is_active()
    }

    /// Identity of the hosted thread, when one is running.
    pub(crate) fn thread_id(&self) -> Option<ThreadId> {
        *self.thread_id.lock()
    }

    /// Spawn the worker thread. A no-op when one is already running.
    pub(crate) fn start(&self, shared: Arc<PoolShared>, name: String, stack_size: usize) {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return;
        }
        let minion = Arc::clone(&self.minion);
        let spawned = Builder::new()
            .name(name.clone())
            .stack_size(stack_size)
            .spawn(move || minion.process(&shared));
        match spawned {
            Ok(handle) => {
                debug!(thread = %name, "worker thread started");
                *self.thread_id.lock() = Some(handle.thread().id());
                *thread = Some(handle);
            }
            Err(error) => warn!(thread = %name, %error, "failed to spawn worker thread"),
        }
    }

    /// Wait for the worker thread to exit. The queue must already be
    /// disabled, otherwise the thread never leaves its dispatch loop. The
    /// join itself happens outside the slot lock so identity probes (a job
    /// revoking itself during shutdown, for instance) stay responsive.
    pub(crate) fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
            *self.thread_id.lock() = None;
        }
    }
}
