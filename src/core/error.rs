//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by [`ThreadPool`](crate::core::ThreadPool) operations.
///
/// Contract violations (destroying a non-idle job cell, handing the pool a
/// zero worker count) are debug assertions, not variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The queue is disabled; the pool is stopped or was never started.
    #[error("queue disabled")]
    Disabled,

    /// A blocking insert or completion wait exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The job is neither queued nor running on any worker.
    #[error("job not found")]
    NotFound,

    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
