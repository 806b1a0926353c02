//! The exclusivity gate serializing registry refresh against registry
//! reads.

use maestro_core::{MaestroError, MaestroResult};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// A single mutual-exclusion lock around a shared value.
///
/// Discovery acquires unconditionally via [`Gate::lock`] for the duration
/// of one refresh. Foreground request handlers acquire via
/// [`Gate::lock_bounded`]: if the gate cannot be taken within the
/// configured wait, the request fails with [`MaestroError::Busy`] instead
/// of blocking indefinitely — a stalled discovery probe must not silently
/// stall user-facing traffic forever. The guard releases the gate on every
/// exit path, error paths included.
#[derive(Debug)]
pub struct Gate<T> {
    inner: Mutex<T>,
    bounded_wait: Duration,
}

impl<T> Gate<T> {
    pub fn new(value: T, bounded_wait: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            bounded_wait,
        }
    }

    /// Blocking acquisition — waits as long as it takes.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }

    /// Bounded acquisition — [`MaestroError::Busy`] after the configured
    /// wait.
    pub async fn lock_bounded(&self) -> MaestroResult<MutexGuard<'_, T>> {
        tokio::time::timeout(self.bounded_wait, self.inner.lock())
            .await
            .map_err(|_| {
                MaestroError::Busy(
                    "Could not acquire lock to process request, please try again later".to_string(),
                )
            })
    }
}
