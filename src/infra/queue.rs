//! Bounded multi-producer multi-consumer queue with timed enqueue.
//!
//! Capacity is the only backpressure mechanism: `push` waits at most the given
//! timeout for space and then fails, it never buffers past capacity. Closing the
//! queue drops the owned sender so consumers drain what is left and then see `None`.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

/// Reasons an enqueue can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No space became available within the timeout.
    #[error("queue full")]
    Full,
    /// The queue was closed.
    #[error("queue closed")]
    Closed,
}

/// Bounded FIFO queue shared between submitters and workers.
pub struct BoundedQueue<T> {
    capacity: usize,
    /// Owned sender; `None` once the queue is closed.
    tx: Mutex<Option<flume::Sender<T>>>,
    rx: flume::Receiver<T>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects that earlier.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        let (tx, rx) = flume::bounded(capacity);
        Self {
            capacity,
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Push an item, waiting up to `timeout` for space.
    ///
    /// On failure the item is dropped; callers own any retry policy.
    ///
    /// # Errors
    ///
    /// - `QueueError::Full` if the queue stayed full for the whole timeout
    /// - `QueueError::Closed` if the queue has been closed
    pub async fn push(&self, item: T, timeout: Duration) -> Result<(), QueueError> {
        // Clone the sender out so the lock is never held across an await.
        let tx = self.tx.lock().clone().ok_or(QueueError::Closed)?;
        match tokio::time::timeout(timeout, tx.send_async(item)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(QueueError::Closed),
            Err(_) => Err(QueueError::Full),
        }
    }

    /// Wait for the next item. Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<T> {
        self.rx.recv_async().await.ok()
    }

    /// Stop accepting items. Items already queued remain available to `pop`.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
