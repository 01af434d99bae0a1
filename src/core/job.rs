//! Per-job submission state machine.
//!
//! A [`JobCell`] wraps a user payload and publishes a single stable
//! [`DispatchHandle`] pointing back at itself. The cell's atomic state
//! guarantees that at most one live clone of that handle represents the job
//! across the queue, a dispatching worker, and the external scheduler, while
//! still allowing submit/reschedule/revoke requests from arbitrary threads
//! to merge safely against an in-progress dispatch.
//!
//! States and transitions:
//!
//! ```text
//! IDLE       --submit-->          SUBMITTED   (emits handle)
//! IDLE       --reschedule(t)-->   SCHEDULE    (emits handle)
//! SUBMITTED  --dispatch begin-->  EXECUTING
//! SUBMITTED  --reschedule(t)-->   SCHEDULE    (emits handle)
//! SUBMITTED  --revoke-->          REVOKING
//! EXECUTING  --submit-->          RESUBMIT
//! EXECUTING  --reschedule(t)-->   SCHEDULE
//! EXECUTING  --revoke-->          REVOKING
//! EXECUTING  --dispatch end-->    IDLE
//! RESUBMIT   --submit-->          RESUBMIT    (idempotent)
//! RESUBMIT   --reschedule(t)-->   SCHEDULE
//! RESUBMIT   --dispatch end-->    SUBMITTED   (emits handle)
//! RESUBMIT   --revoke-->          REVOKING
//! SCHEDULE   --revoke-->          REVOKING
//! SCHEDULE   --dispatch end-->    SUBMITTED   (emits handle + instant)
//! REVOKING   --revoked-->         IDLE
//! ```
//!
//! Every operation performs at most one successful compare-exchange, so
//! concurrent callers interleave without locks and no call can produce a
//! second queue entry for the same cell.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use crate::core::dispatch::{Dispatch, DispatchHandle, ReusableJob};

const IDLE: u8 = 0;
const SUBMITTED: u8 = 1;
const EXECUTING: u8 = 2;
const RESUBMIT: u8 = 3;
const SCHEDULE: u8 = 4;
const REVOKING: u8 = 5;

struct CellInner<P> {
    payload: P,
    state: AtomicU8,
    /// Instant consumed by dispatch-end when leaving `SCHEDULE`. `None`
    /// means "run immediately".
    scheduled: Mutex<Option<Instant>>,
    /// Back-reference used to mint self-handle clones from trait-object
    /// context. Always upgradable while any handle is alive.
    weak: Weak<CellInner<P>>,
}

impl<P> CellInner<P> {
    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<P: Dispatch> CellInner<P> {
    fn self_handle(&self) -> Option<DispatchHandle> {
        let strong = self.weak.upgrade()?;
        let target: Arc<dyn Dispatch> = Arc::clone(&strong) as Arc<dyn Dispatch>;
        let reusable: Arc<dyn ReusableJob> = strong;
        Some(DispatchHandle::with_capability(target, reusable))
    }
}

impl<P: Dispatch> Dispatch for CellInner<P> {
    /// Dispatch-begin: only a `SUBMITTED` cell may start executing. A failed
    /// exchange means a revoke or a scheduled activation won the race, and
    /// the user payload must not run this round.
    fn dispatch(&self) {
        if self.transition(SUBMITTED, EXECUTING) {
            self.payload.dispatch();
        }
    }
}

impl<P: Dispatch> ReusableJob for CellInner<P> {
    /// Dispatch-end. Exactly one of the following holds: the cell returns
    /// to `IDLE` and nothing is enqueued, or a merged submit/reschedule is
    /// converted into a fresh `SUBMITTED` round and the self-handle is
    /// emitted once.
    fn resubmit(&self) -> Option<(DispatchHandle, Option<Instant>)> {
        if self.transition(EXECUTING, IDLE) {
            None
        } else if self.transition(RESUBMIT, SUBMITTED) {
            self.self_handle().map(|h| (h, None))
        } else if self.transition(SCHEDULE, SUBMITTED) {
            let when = self.scheduled.lock().take();
            self.self_handle().map(|h| (h, when))
        } else {
            // Revoked mid-dispatch; the revoker owns the path back to IDLE.
            None
        }
    }
}

/// Outcome of [`JobCell::revoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revoke {
    /// The cell was (or already is) marked `REVOKING`. Pass the handle to
    /// [`ThreadPool::revoke`](crate::core::ThreadPool::revoke), then call
    /// [`JobCell::revoked`] to restore `IDLE`.
    Needed(DispatchHandle),
    /// The cell is idle; there is nothing to revoke.
    Idle,
}

/// Stateful container for a reusable payload plus its submission state.
///
/// The cell hands out clones of one persistent self-handle. Operations
/// return `Some(handle)` when the caller must enqueue (or hand to the
/// scheduler) the emitted clone, and `None` when the request was absorbed
/// because the cell is already represented somewhere.
///
/// ```
/// use dispatch_pool::{Dispatch, JobCell};
///
/// struct Tick;
/// impl Dispatch for Tick {
///     fn dispatch(&self) {}
/// }
///
/// let cell = JobCell::new(Tick);
/// let first = cell.submit();
/// assert!(first.is_some());
/// // Already submitted: merged, nothing new to enqueue.
/// assert!(cell.submit().is_none());
/// # first.unwrap().dispatch();
/// # cell.handle().reusable().unwrap().resubmit();
/// ```
pub struct JobCell<P: Dispatch> {
    inner: Arc<CellInner<P>>,
    handle: DispatchHandle,
}

impl<P: Dispatch> JobCell<P> {
    /// Wrap `payload` into an idle cell.
    pub fn new(payload: P) -> Self {
        let inner = Arc::new_cyclic(|weak| CellInner {
            payload,
            state: AtomicU8::new(IDLE),
            scheduled: Mutex::new(None),
            weak: weak.clone(),
        });
        let target: Arc<dyn Dispatch> = Arc::clone(&inner) as Arc<dyn Dispatch>;
        let reusable: Arc<dyn ReusableJob> = Arc::clone(&inner) as Arc<dyn ReusableJob>;
        let handle = DispatchHandle::with_capability(target, reusable);
        Self { inner, handle }
    }

    /// Whether the cell currently has no representation anywhere.
    pub fn is_idle(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == IDLE
    }

    /// A clone of the stable self-handle, for identity operations such as
    /// membership probes or revocation by handle.
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Shared access to the embedded payload.
    pub fn payload(&self) -> &P {
        &self.inner.payload
    }

    /// Request a run. Emits a handle to enqueue when the cell was idle;
    /// merges into the in-flight round (`RESUBMIT`) when the cell is
    /// executing or scheduled, in which case exactly one more dispatch will
    /// follow the current one.
    ///
    /// If enqueueing the emitted handle fails, the cell is left `SUBMITTED`;
    /// recover with [`revoke`](Self::revoke) + [`revoked`](Self::revoked).
    pub fn submit(&self) -> Option<DispatchHandle> {
        let inner = &self.inner;
        if inner.transition(EXECUTING, RESUBMIT)
            || inner.transition(SCHEDULE, RESUBMIT)
            || !inner.transition(IDLE, SUBMITTED)
        {
            None
        } else {
            Some(self.handle())
        }
    }

    /// Request a run, but only if the cell is idle. No merging: a cell that
    /// is already represented is left untouched.
    pub fn submit_if_idle(&self) -> Option<DispatchHandle> {
        if self.inner.transition(IDLE, SUBMITTED) {
            Some(self.handle())
        } else {
            None
        }
    }

    /// Request a run no earlier than `when`.
    ///
    /// When the cell is executing (or already merged), the request is
    /// absorbed and takes effect at dispatch-end; no handle is emitted. When
    /// the cell was idle or queued, the emitted handle must be handed to the
    /// scheduler by the caller, who is also expected to remove the
    /// already-queued clone, if any.
    pub fn reschedule(&self, when: Instant) -> Option<DispatchHandle> {
        let inner = &self.inner;
        *inner.scheduled.lock() = Some(when);

        if inner.transition(EXECUTING, SCHEDULE)
            || inner.transition(RESUBMIT, SCHEDULE)
            || !(inner.transition(SUBMITTED, SCHEDULE) || inner.transition(IDLE, SCHEDULE))
        {
            None
        } else {
            Some(self.handle())
        }
    }

    /// Begin revocation.
    ///
    /// From any represented state the cell moves to `REVOKING` and the
    /// caller receives the handle to pass to
    /// [`ThreadPool::revoke`](crate::core::ThreadPool::revoke); once the
    /// pool confirms no worker is dispatching the job, finish with
    /// [`revoked`](Self::revoked). An idle cell reports [`Revoke::Idle`].
    pub fn revoke(&self) -> Revoke {
        let inner = &self.inner;
        let revoking = inner.state.load(Ordering::Acquire) == REVOKING
            || inner.transition(SUBMITTED, REVOKING)
            || inner.transition(EXECUTING, REVOKING)
            || inner.transition(RESUBMIT, REVOKING)
            || inner.transition(SCHEDULE, REVOKING);

        if revoking {
            Revoke::Needed(self.handle())
        } else {
            Revoke::Idle
        }
    }

    /// Finish revocation, restoring `IDLE`. Only legal while the cell is
    /// `REVOKING`.
    pub fn revoked(&self) {
        let result = self.inner.transition(REVOKING, IDLE);
        debug_assert!(result, "revoked() called on a cell that is not revoking");
    }
}

impl<P: Dispatch> Drop for JobCell<P> {
    fn drop(&mut self) {
        debug_assert!(
            self.inner.state.load(Ordering::Acquire) == IDLE,
            "job cell destroyed while still represented in the pool"
        );
    }
}
