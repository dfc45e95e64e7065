//! Lock helpers shared by the cache and the rate limiter.

use std::sync::{Mutex, MutexGuard};

use tracing::error;

/// Acquires `mutex`, or returns `None` if a previous holder panicked.
///
/// Callers degrade instead of propagating the fault: the cache reports a
/// miss and the rate limiter allows the request.
pub(crate) fn acquire<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Option<MutexGuard<'a, T>> {
    match mutex.lock() {
        Ok(guard) => Some(guard),
        Err(_) => {
            error!(structure = what, "lock poisoned, degrading");
            None
        }
    }
}
