//! # dispatch-pool
//!
//! A reusable-job thread pool: a fixed set of worker threads consuming
//! dispatch handles from a shared bounded queue, plus a per-job atomic state
//! machine that makes each job individually submittable, re-submittable,
//! reschedulable, and revocable with well-defined semantics under concurrent
//! access.
//!
//! ## Modules
//!
//! - [`core`] - the queue, job cells, workers, and the [`ThreadPool`] facade
//! - [`config`] - serde-backed pool configuration
//! - [`util`] - telemetry bootstrap
//!
//! ## One-shot work
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use dispatch_pool::{Dispatch, DispatchHandle, DirectDispatcher, ThreadPool, ThreadPoolConfig};
//!
//! struct Count(Arc<AtomicUsize>);
//! impl Dispatch for Count {
//!     fn dispatch(&self) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let pool = ThreadPool::new(
//!     ThreadPoolConfig::new().with_worker_count(2).with_queue_capacity(8),
//!     Arc::new(DirectDispatcher),
//!     None,
//! ).unwrap();
//! pool.run();
//!
//! pool.submit(DispatchHandle::new(Count(hits.clone())), Duration::from_secs(1)).unwrap();
//! pool.stop();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Reusable jobs
//!
//! A [`JobCell`] wraps a payload and merges concurrent submit, reschedule,
//! and revoke requests against an in-progress dispatch, guaranteeing the job
//! is represented by at most one queue entry at any time:
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dispatch_pool::{Dispatch, DirectDispatcher, JobCell, ThreadPool, ThreadPoolConfig};
//!
//! struct Refresh;
//! impl Dispatch for Refresh {
//!     fn dispatch(&self) { /* rebuild a cache, poll a device, ... */ }
//! }
//!
//! let pool = ThreadPool::new(
//!     ThreadPoolConfig::new().with_worker_count(1).with_queue_capacity(8),
//!     Arc::new(DirectDispatcher),
//!     None,
//! ).unwrap();
//! pool.run();
//!
//! let job = JobCell::new(Refresh);
//! if let Some(handle) = job.submit() {
//!     pool.submit(handle, Duration::from_secs(1)).unwrap();
//! }
//! pool.stop();
//! // The round completed before the pool stopped; the cell is idle again.
//! assert!(job.is_idle());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod util;

pub use crate::config::ThreadPoolConfig;
pub use crate::core::{
    DirectDispatcher, Dispatch, DispatchHandle, Dispatcher, JobCell, PoolError, ReusableJob,
    Revoke, Scheduler, ThreadPool, WorkQueue,
};
