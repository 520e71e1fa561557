//! Error types for service operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a worker while executing a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task type is not one the executor knows how to run.
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),
    /// A modelled call to an external dependency failed.
    #[error("dependency failure: {0}")]
    SimulatedDependencyFailure(String),
    /// The executor panicked; the worker caught it and stayed alive.
    #[error("executor panicked while running task")]
    ExecutorPanicked,
}

impl TaskError {
    /// Key used for the error counter when a worker reports this failure.
    #[must_use]
    pub const fn metric_kind(&self) -> &'static str {
        match self {
            Self::UnknownTaskType(_) => "unknown_task_type",
            Self::SimulatedDependencyFailure(_) => "external_api_timeout",
            Self::ExecutorPanicked => "executor_panic",
        }
    }
}

/// What a caller can safely do after a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAdvice {
    /// Nothing ran; the request can be sent again.
    Retry,
    /// The request ran and failed, or can never succeed as written.
    DoNotRetry,
    /// The request may have run; only retry if it is idempotent.
    IdempotentRetry,
}

/// Caller-facing errors produced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No admission permit became available within the bound.
    #[error("admission rejected: no permit available within {waited:?}")]
    AdmissionRejected {
        /// How long the caller waited for a permit.
        waited: Duration,
    },
    /// The task queue stayed full for longer than the enqueue timeout.
    #[error("queue full: capacity {capacity} exhausted for {waited:?}")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
        /// How long the enqueue waited.
        waited: Duration,
    },
    /// A worker ran the task and reported a failure.
    #[error("task {task_id} failed: {source}")]
    TaskFailed {
        /// Identifier of the failed task.
        task_id: String,
        /// Failure reported by the worker.
        source: TaskError,
    },
    /// The caller stopped waiting for the task result.
    #[error("timed out after {timeout:?} waiting for task {task_id}")]
    ResultTimeout {
        /// Identifier of the task still in flight.
        task_id: String,
        /// The wait bound that elapsed.
        timeout: Duration,
    },
    /// A worker could not hand a result back because the requester was gone.
    #[error("result for task {task_id} dropped: requester no longer waiting")]
    DeliveryTimeout {
        /// Identifier of the orphaned task.
        task_id: String,
    },
    /// Draining the processor exceeded its bound.
    #[error("shutdown did not complete within {timeout:?}")]
    ShutdownTimeout {
        /// The drain bound that elapsed.
        timeout: Duration,
    },
    /// The service no longer accepts new requests.
    #[error("service is shutting down")]
    ShuttingDown,
    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A cache lookup was issued without a key.
    #[error("missing key parameter")]
    MissingKey,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    /// Stable error category exposed on the request/response surface.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AdmissionRejected { .. } => "admission_rejected",
            Self::QueueFull { .. } => "service_busy",
            Self::TaskFailed { .. } => "task_failed",
            Self::ResultTimeout { .. } => "request_timeout",
            Self::DeliveryTimeout { .. } => "result_lost",
            Self::ShutdownTimeout { .. } => "shutdown_timeout",
            Self::ShuttingDown => "shutting_down",
            Self::InvalidInput(_) => "invalid_input",
            Self::MissingKey => "missing_key",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Key used for the error counter when the orchestrator records this error.
    #[must_use]
    pub const fn metric_kind(&self) -> &'static str {
        match self {
            Self::AdmissionRejected { .. } => "admission_rejected",
            Self::QueueFull { .. } => "queue_full",
            Self::TaskFailed { .. } => "task_failed",
            Self::ResultTimeout { .. } => "task_timeout",
            Self::DeliveryTimeout { .. } => "delivery_timeout",
            Self::ShutdownTimeout { .. } => "shutdown_timeout",
            Self::ShuttingDown => "shutting_down",
            Self::InvalidInput(_) => "invalid_input",
            Self::MissingKey => "missing_key",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Whether the caller may resend the request.
    #[must_use]
    pub const fn retry_advice(&self) -> RetryAdvice {
        match self {
            Self::AdmissionRejected { .. } | Self::QueueFull { .. } | Self::ShuttingDown => {
                RetryAdvice::Retry
            }
            Self::ResultTimeout { .. } | Self::DeliveryTimeout { .. } => {
                RetryAdvice::IdempotentRetry
            }
            Self::TaskFailed { .. }
            | Self::ShutdownTimeout { .. }
            | Self::InvalidInput(_)
            | Self::MissingKey
            | Self::InvalidConfig(_) => RetryAdvice::DoNotRetry,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
