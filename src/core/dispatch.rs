//! Dispatch handles and the collaborator contracts consumed by the pool.
//!
//! A [`DispatchHandle`] is a cheaply cloneable, reference-counted reference
//! to one unit of work. The pool never inspects the payload beyond calling
//! [`Dispatch::dispatch`] and, for handles that carry it, the reusable-job
//! capability consulted after a dispatch completes. Two handles compare
//! equal iff they refer to the same underlying allocation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

/// A unit of work the pool can execute.
///
/// `dispatch` is invoked from a worker thread; implementations must be
/// thread-safe. The pool treats the call as opaque best-effort and moves on
/// to the next queue entry regardless of what it does.
pub trait Dispatch: Send + Sync + 'static {
    /// Execute this unit of work.
    fn dispatch(&self);
}

/// Capability exposed by handles that originate from a
/// [`JobCell`](crate::core::JobCell): after a dispatch completes, the pool
/// asks the cell whether the job wants to run again.
///
/// A `Some` result carries the handle to enqueue and, when the re-run was
/// requested via `reschedule`, the instant before which it must not start.
/// `None` means the cell returned to idle (or is being revoked) and nothing
/// may be enqueued.
pub trait ReusableJob: Send + Sync {
    /// Consume the pending submit/reschedule request, if any.
    fn resubmit(&self) -> Option<(DispatchHandle, Option<Instant>)>;
}

/// User-supplied object that executes extracted handles.
///
/// One dispatcher is shared read-only across all workers; `dispatch` must be
/// thread-safe and must not reenter the pool in a blocking way from a worker
/// thread.
pub trait Dispatcher: Send + Sync + 'static {
    /// Called once per worker thread on entry.
    fn initialize(&self) {}

    /// Called once per worker thread on exit.
    fn deinitialize(&self) {}

    /// Execute one extracted handle. The common implementation simply calls
    /// `job.dispatch()`; wrappers may add instrumentation around it.
    fn dispatch(&self, job: &DispatchHandle);
}

/// Dispatcher that invokes the handle directly, with no wrapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl Dispatcher for DirectDispatcher {
    fn dispatch(&self, job: &DispatchHandle) {
        job.dispatch();
    }
}

/// Optional external collaborator that defers re-enqueue of a reusable job
/// until a wall-clock instant.
///
/// The implementation is expected to feed `job` back through
/// [`ThreadPool::submit`](crate::core::ThreadPool::submit) no earlier than
/// `when`.
pub trait Scheduler: Send + Sync + 'static {
    /// Request that `job` be resubmitted no earlier than `when`.
    fn schedule(&self, when: Instant, job: DispatchHandle);
}

/// Reference-counted handle to one dispatchable unit of work.
///
/// Clones are cheap and share identity: equality, hashing, and the queue's
/// membership/removal operations all compare the underlying allocation, not
/// the payload. Handles built with [`DispatchHandle::new`] are one-shot;
/// handles published by a [`JobCell`](crate::core::JobCell) additionally
/// carry the reusable-job capability.
#[derive(Clone)]
pub struct DispatchHandle {
    target: Arc<dyn Dispatch>,
    reusable: Option<Arc<dyn ReusableJob>>,
}

impl DispatchHandle {
    /// Wrap a payload into a one-shot handle.
    pub fn new<D: Dispatch>(payload: D) -> Self {
        Self {
            target: Arc::new(payload),
            reusable: None,
        }
    }

    /// Build a handle whose target also exposes the reusable-job capability.
    /// Both fields alias the same allocation, so identity stays unambiguous.
    pub(crate) fn with_capability(
        target: Arc<dyn Dispatch>,
        reusable: Arc<dyn ReusableJob>,
    ) -> Self {
        Self {
            target,
            reusable: Some(reusable),
        }
    }

    /// Execute the underlying unit of work.
    pub fn dispatch(&self) {
        self.target.dispatch();
    }

    /// The reusable-job capability, if this handle carries one.
    pub fn reusable(&self) -> Option<&Arc<dyn ReusableJob>> {
        self.reusable.as_ref()
    }

    /// Raw identity of the underlying allocation. Metadata (the vtable) is
    /// deliberately ignored so clones obtained through different trait
    /// objects of the same cell still match.
    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.target).cast::<()>()
    }
}

impl PartialEq for DispatchHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for DispatchHandle {}

impl Hash for DispatchHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("addr", &self.addr())
            .field("reusable", &self.reusable.is_some())
            .finish()
    }
}
