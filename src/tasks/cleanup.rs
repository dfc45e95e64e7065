//! Maintenance Task
//!
//! Background task that periodically runs the coordinator's maintenance pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::CacheCoordinator;

/// Spawns a background task that periodically runs cache maintenance.
///
/// The task sleeps for the interval, then runs
/// [`CacheCoordinator::run_maintenance`] on the blocking pool, since the
/// batched pass locks and yields the OS thread between batches. The pass
/// itself logs what it removed.
///
/// # Arguments
/// * `cache` - shared coordinator
/// * `cleanup_interval_secs` - Interval in seconds between maintenance runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheCoordinator::<String>::default());
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 300);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: Arc<CacheCoordinator<V>>, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    V: Send + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache maintenance task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let pass = Arc::clone(&cache);
            if let Err(err) = tokio::task::spawn_blocking(move || pass.run_maintenance()).await {
                error!(error = %err, "cache maintenance pass failed");
            }
        }
    })
}
