//! Task model: types, payloads, outputs and the single-use reply slot.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::error::TaskError;

/// Arbitrary JSON-like task input.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Kind of work a task asks for.
///
/// Unrecognised names are kept as `Unknown` so the worker, not the submitter,
/// reports them as a typed failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// CPU-style computation.
    Compute,
    /// Simulated database query.
    Database,
    /// Simulated call to an unreliable external API.
    ExternalApi,
    /// Any other requested type.
    Unknown(String),
}

impl TaskType {
    /// Every type the executor supports.
    pub const SUPPORTED: [Self; 3] = [Self::Compute, Self::Database, Self::ExternalApi];

    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Compute => "compute",
            Self::Database => "database",
            Self::ExternalApi => "external_api",
            Self::Unknown(name) => name,
        }
    }
}

impl From<&str> for TaskType {
    fn from(name: &str) -> Self {
        match name {
            "compute" => Self::Compute,
            "database" => Self::Database,
            "external_api" => Self::ExternalApi,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// Lifecycle of a task, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Built by the orchestrator, not yet queued.
    Submitted,
    /// Sitting in the bounded queue.
    Queued,
    /// Picked up by a worker.
    Processing,
    /// Finished with an output.
    Completed,
    /// Finished with an error.
    Failed,
    /// Requester stopped waiting before the result arrived.
    TimedOut,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Typed result of a successful task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Result of a `compute` task.
    Compute {
        /// Always `"completed"`.
        computation: String,
        /// Computed value.
        value: u32,
    },
    /// Result of a `database` task.
    Database {
        /// Number of records returned.
        records: u32,
    },
    /// Result of an `external_api` task.
    ExternalApi {
        /// Status reported by the dependency.
        status: String,
    },
}

/// Outcome of one task, produced by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    /// Identifier of the task this result belongs to.
    pub task_id: String,
    /// Output or worker-reported failure.
    pub outcome: Result<TaskOutput, TaskError>,
}

/// A unit of work travelling from the orchestrator to a worker.
#[derive(Debug)]
pub struct Task {
    /// Unique identifier.
    pub id: String,
    /// Requested kind of work.
    pub task_type: TaskType,
    /// Caller-supplied input.
    pub payload: Payload,
    /// Where the worker posts the result.
    pub reply: ReplySlot,
}

impl Task {
    /// Build a task together with the handle its requester waits on.
    #[must_use]
    pub fn new(id: impl Into<String>, task_type: TaskType, payload: Payload) -> (Self, ReplyHandle) {
        let (tx, rx) = oneshot::channel();
        let id = id.into();
        let task = Self {
            id: id.clone(),
            task_type,
            payload,
            reply: ReplySlot { tx },
        };
        (task, ReplyHandle { task_id: id, rx })
    }
}

/// Producer half of a reply destination. Consumed by delivery, so at most one
/// result can ever be sent.
#[derive(Debug)]
pub struct ReplySlot {
    tx: oneshot::Sender<TaskResult>,
}

impl ReplySlot {
    /// Hand the result to the requester.
    ///
    /// # Errors
    ///
    /// Returns the result back if the requester has already given up.
    pub fn deliver(self, result: TaskResult) -> Result<(), TaskResult> {
        self.tx.send(result)
    }
}

/// Why waiting on a reply ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    /// The wait bound elapsed.
    TimedOut,
    /// The task was dropped without ever being answered.
    Dropped,
}

/// Consumer half of a reply destination.
#[derive(Debug)]
pub struct ReplyHandle {
    task_id: String,
    rx: oneshot::Receiver<TaskResult>,
}

impl ReplyHandle {
    /// Identifier of the task this handle waits for.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the result, at most `timeout`. Dropping the handle on timeout
    /// makes a later delivery fail, which the worker logs and discards.
    ///
    /// # Errors
    ///
    /// - `ReplyError::TimedOut` if nothing arrived within `timeout`
    /// - `ReplyError::Dropped` if the task was discarded unanswered
    pub async fn wait(self, timeout: Duration) -> Result<TaskResult, ReplyError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(ReplyError::Dropped),
            Err(_) => Err(ReplyError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parsing() {
        assert_eq!(TaskType::from("compute"), TaskType::Compute);
        assert_eq!(TaskType::from("database"), TaskType::Database);
        assert_eq!(TaskType::from("external_api"), TaskType::ExternalApi);
        assert_eq!(
            TaskType::from("unsupported"),
            TaskType::Unknown("unsupported".into())
        );
        assert_eq!(TaskType::Unknown("x".into()).to_string(), "x");
    }

    #[test]
    fn test_task_type_serde_is_plain_string() {
        let json = serde_json::to_string(&TaskType::ExternalApi).unwrap();
        assert_eq!(json, "\"external_api\"");
        let back: TaskType = serde_json::from_str("\"weird\"").unwrap();
        assert_eq!(back, TaskType::Unknown("weird".into()));
    }

    #[test]
    fn test_output_is_tagged() {
        let value = serde_json::to_value(TaskOutput::Database { records: 7 }).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "database", "records": 7}));
    }

    #[tokio::test]
    async fn test_reply_round_trip() {
        let (task, handle) = Task::new("task-1", TaskType::Compute, Payload::new());
        assert_eq!(handle.task_id(), "task-1");
        task.reply
            .deliver(TaskResult {
                task_id: task.id.clone(),
                outcome: Ok(TaskOutput::Database { records: 1 }),
            })
            .unwrap();
        let result = handle.wait(Duration::from_millis(50)).await.unwrap();
        assert_eq!(result.task_id, "task-1");
    }

    #[tokio::test]
    async fn test_abandoned_reply_returns_result() {
        let (task, handle) = Task::new("task-2", TaskType::Compute, Payload::new());
        let err = handle.wait(Duration::from_millis(5)).await;
        assert_eq!(err.unwrap_err(), ReplyError::TimedOut);
        let undelivered = task
            .reply
            .deliver(TaskResult {
                task_id: "task-2".into(),
                outcome: Err(TaskError::ExecutorPanicked),
            })
            .unwrap_err();
        assert_eq!(undelivered.task_id, "task-2");
    }

    #[tokio::test]
    async fn test_dropped_task_reports_dropped() {
        let (task, handle) = Task::new("task-3", TaskType::Compute, Payload::new());
        drop(task);
        assert_eq!(
            handle.wait(Duration::from_millis(50)).await.unwrap_err(),
            ReplyError::Dropped
        );
    }
}
