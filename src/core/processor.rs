//! Fixed-size worker pool pulling tasks from a bounded queue.
//!
//! # Design
//!
//! - **Bounded queue**: `submit` waits at most the enqueue timeout, then fails with
//!   `QueueFull`. The processor never retries a rejected task.
//! - **Reply slots**: each task carries a oneshot sender; the worker that dequeues it
//!   is the only one that can answer. If the requester already left, the result is
//!   dropped with a warning.
//! - **Drain on stop**: `stop` closes the queue so workers finish what is queued and
//!   in flight, then exit. The global cancellation token makes workers leave between
//!   tasks without waiting for the queue to empty.
//! - **Panic isolation**: executor panics are caught and reported as a task failure.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{ServiceError, TaskError};
use super::executor::TaskExecutor;
use super::metrics::MetricsAggregator;
use super::task::{Task, TaskResult, TaskState};
use crate::infra::{BoundedQueue, QueueError};

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// Number of workers.
    pub worker_count: usize,
    /// Maximum queued tasks.
    pub queue_capacity: usize,
}

/// Point-in-time processor statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorStats {
    /// Number of workers.
    pub worker_count: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
    /// Tasks currently executing.
    pub active: u64,
    /// Tasks accepted onto the queue.
    pub submitted: u64,
    /// Tasks that reached a terminal state.
    pub processed: u64,
    /// Processed tasks whose outcome was an error.
    pub failed: u64,
}

/// Internal counters (lock-free).
#[derive(Debug, Default)]
struct ProcessorCounters {
    active: AtomicU64,
    submitted: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Worker pool with a bounded task queue.
pub struct TaskProcessor {
    queue: Arc<BoundedQueue<Task>>,
    counters: Arc<ProcessorCounters>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    accepting: AtomicBool,
    worker_count: usize,
}

impl TaskProcessor {
    /// Spawn `config.worker_count` workers on the current tokio runtime.
    ///
    /// Workers report task failures to `metrics` and exit between tasks once
    /// `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidConfig` if a size is zero.
    pub fn start<E: TaskExecutor>(
        config: ProcessorConfig,
        executor: E,
        metrics: Arc<MetricsAggregator>,
        shutdown: &CancellationToken,
    ) -> Result<Self, ServiceError> {
        if config.worker_count == 0 {
            return Err(ServiceError::InvalidConfig(
                "worker_count must be greater than 0".into(),
            ));
        }
        if config.queue_capacity == 0 {
            return Err(ServiceError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let counters = Arc::new(ProcessorCounters::default());

        let workers = (0..config.worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&counters),
                    executor.clone(),
                    Arc::clone(&metrics),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            "task processor started"
        );

        Ok(Self {
            queue,
            counters,
            workers: Mutex::new(workers),
            accepting: AtomicBool::new(true),
            worker_count: config.worker_count,
        })
    }

    /// Place a task on the queue, waiting at most `enqueue_timeout` for space.
    ///
    /// A rejected task is dropped; its requester sees the reply slot close.
    ///
    /// # Errors
    ///
    /// - `ServiceError::QueueFull` if the queue stayed full for the whole timeout
    /// - `ServiceError::ShuttingDown` if `stop` has been called
    pub async fn submit(&self, task: Task, enqueue_timeout: Duration) -> Result<(), ServiceError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(ServiceError::ShuttingDown);
        }

        let task_id = task.id.clone();
        debug!(task_id = %task_id, state = %TaskState::Submitted, "submitting task");

        match self.queue.push(task, enqueue_timeout).await {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = %task_id, state = %TaskState::Queued, "task queued");
                Ok(())
            }
            Err(QueueError::Full) => {
                warn!(
                    task_id = %task_id,
                    capacity = self.queue.capacity(),
                    "task queue is full"
                );
                Err(ServiceError::QueueFull {
                    capacity: self.queue.capacity(),
                    waited: enqueue_timeout,
                })
            }
            Err(QueueError::Closed) => Err(ServiceError::ShuttingDown),
        }
    }

    /// Stop accepting tasks and wait, at most `timeout`, for workers to finish
    /// everything already queued or in flight.
    ///
    /// Calling `stop` again after it has run returns immediately.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ShutdownTimeout` if workers were still busy when the
    /// bound elapsed. They keep running in the background; `stop` does not retry.
    pub async fn stop(&self, timeout: Duration) -> Result<(), ServiceError> {
        if !self.accepting.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        info!(
            queued = self.queue.len(),
            active = self.counters.active.load(Ordering::Relaxed),
            "stopping task processor"
        );
        self.queue.close();

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        let worker_count = workers.len();

        match tokio::time::timeout(timeout, futures::future::join_all(workers)).await {
            Ok(results) => {
                for (worker_id, result) in results.into_iter().enumerate() {
                    if let Err(e) = result {
                        warn!(worker_id = worker_id, error = %e, "worker ended abnormally");
                    }
                }
                info!(worker_count = worker_count, "task processor stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis(),
                    active = self.counters.active.load(Ordering::Relaxed),
                    queued = self.queue.len(),
                    "task processor did not drain within timeout"
                );
                Err(ServiceError::ShutdownTimeout { timeout })
            }
        }
    }

    /// Tasks that reached a terminal state since startup.
    #[must_use]
    pub fn processed_count(&self) -> u64 {
        self.counters.processed.load(Ordering::Relaxed)
    }

    /// Number of workers.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            worker_count: self.worker_count,
            queue_capacity: self.queue.capacity(),
            queued: self.queue.len(),
            active: self.counters.active.load(Ordering::Relaxed),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for TaskProcessor {
    fn drop(&mut self) {
        // Closing the queue lets idle workers exit; nothing is joined here.
        if self.accepting.swap(false, Ordering::AcqRel) {
            self.queue.close();
            debug!("TaskProcessor dropped without explicit stop - workers will be detached");
        }
    }
}

async fn worker_loop<E: TaskExecutor>(
    worker_id: usize,
    queue: Arc<BoundedQueue<Task>>,
    counters: Arc<ProcessorCounters>,
    executor: E,
    metrics: Arc<MetricsAggregator>,
    shutdown: CancellationToken,
) {
    debug!(worker_id = worker_id, "worker started");

    loop {
        let task = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!(worker_id = worker_id, "worker observed shutdown signal");
                break;
            }
            next = queue.pop() => match next {
                Some(task) => task,
                None => {
                    debug!(worker_id = worker_id, "queue closed and drained");
                    break;
                }
            },
        };

        let Task {
            id,
            task_type,
            payload,
            reply,
        } = task;

        counters.active.fetch_add(1, Ordering::Relaxed);
        debug!(
            worker_id = worker_id,
            task_id = %id,
            task_type = %task_type,
            state = %TaskState::Processing,
            "worker executing task"
        );

        let outcome = AssertUnwindSafe(executor.execute(&task_type, &payload))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(worker_id = worker_id, task_id = %id, "executor panicked");
                Err(TaskError::ExecutorPanicked)
            });

        counters.active.fetch_sub(1, Ordering::Relaxed);

        match &outcome {
            Ok(_) => {
                debug!(worker_id = worker_id, task_id = %id, state = %TaskState::Completed, "task completed");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics.record_error(e.metric_kind());
                debug!(
                    worker_id = worker_id,
                    task_id = %id,
                    state = %TaskState::Failed,
                    error = %e,
                    "task failed"
                );
            }
        }

        // Counted before delivery so a requester never sees its own task missing.
        counters.processed.fetch_add(1, Ordering::Relaxed);

        if let Err(orphaned) = reply.deliver(TaskResult {
            task_id: id,
            outcome,
        }) {
            let err = ServiceError::DeliveryTimeout {
                task_id: orphaned.task_id,
            };
            warn!(worker_id = worker_id, error = %err, "dropping orphaned task result");
        }
    }

    debug!(worker_id = worker_id, "worker exiting");
}
