//! Pool configuration.

use serde::{Deserialize, Serialize};

/// Default number of worker threads: the CPU count.
fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Default thread stack size: 2MB.
fn default_thread_stack_size() -> usize {
    2 * 1024 * 1024
}

/// Default queue capacity.
fn default_queue_capacity() -> usize {
    64
}

/// Default worker thread name prefix.
fn default_thread_name() -> String {
    "pool-worker".to_string()
}

/// Configuration for a [`ThreadPool`](crate::core::ThreadPool).
///
/// # Example
///
/// ```rust
/// use dispatch_pool::ThreadPoolConfig;
///
/// let config = ThreadPoolConfig::new()
///     .with_worker_count(4)
///     .with_queue_capacity(128)
///     .with_thread_name("ingest");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadPoolConfig {
    /// Number of worker threads.
    ///
    /// Default: `num_cpus::get()`.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Stack size per worker thread in bytes.
    ///
    /// Default: 2MB (2 * 1024 * 1024 bytes).
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,

    /// Number of handles the queue accepts before blocking inserts.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Prefix for worker thread names; the slot index is appended.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            thread_stack_size: default_thread_stack_size(),
            queue_capacity: default_queue_capacity(),
            thread_name: default_thread_name(),
        }
    }
}

impl ThreadPoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the thread stack size in bytes.
    #[must_use]
    pub fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = size;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64KB".into());
        }
        if self.thread_name.is_empty() {
            return Err("thread_name must not be empty".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }
}
