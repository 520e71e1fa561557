//! Admission control with a counting permit pool.
//!
//! A permit is an RAII guard: it returns to the pool when dropped, so every exit
//! path of a request (success, error, panic) releases exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use super::error::ServiceError;

/// Bounds the number of concurrently admitted requests.
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
}

/// Proof of admission. Dropping it releases the permit.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Return the permit to the pool. Equivalent to dropping it.
    pub fn release(self) {}
}

impl AdmissionController {
    /// Create a pool with `max_permits` permits.
    ///
    /// # Panics
    ///
    /// Panics if `max_permits` exceeds `Semaphore::MAX_PERMITS`. Service
    /// configuration rejects such values before they get here.
    #[must_use]
    pub fn new(max_permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
        }
    }

    /// Wait up to `timeout` for a permit.
    ///
    /// # Errors
    ///
    /// - `ServiceError::AdmissionRejected` if no permit freed up in time
    /// - `ServiceError::ShuttingDown` if the pool has been closed
    pub async fn acquire(&self, timeout: Duration) -> Result<AdmissionPermit, ServiceError> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        match tokio::time::timeout(timeout, acquire).await {
            Ok(Ok(permit)) => Ok(AdmissionPermit { _permit: permit }),
            Ok(Err(_)) => Err(ServiceError::ShuttingDown),
            Err(_) => {
                warn!(
                    active = self.active_count(),
                    max = self.max_permits,
                    "admission rejected"
                );
                Err(ServiceError::AdmissionRejected { waited: timeout })
            }
        }
    }

    /// Permits currently held. A point-in-time snapshot.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.max_permits
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Configured maximum.
    #[must_use]
    pub const fn max_permits(&self) -> usize {
        self.max_permits
    }

    /// Refuse all further acquisitions. Permits already held stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
