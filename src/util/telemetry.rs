//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

/// Install an env-filtered `fmt` subscriber unless the host application has
/// already set one up. The filter honours `RUST_LOG`; without it, this
/// crate's lifecycle events are shown at `info`. Worker thread names are
/// included in the output so per-worker activity can be told apart.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dispatch_pool=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
