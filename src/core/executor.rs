//! Task execution trait and the simulated executor used by the service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use super::error::TaskError;
use super::task::{Payload, TaskOutput, TaskType};
use crate::config::SimulationConfig;

/// Runs the business logic of a task.
///
/// Workers clone the executor once each and call `execute` for every task they
/// dequeue. An `Err` becomes the task's failure result; it never stops the worker.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use taskgate::core::{Payload, TaskError, TaskExecutor, TaskOutput, TaskType};
///
/// #[derive(Clone)]
/// struct CountingExecutor;
///
/// #[async_trait]
/// impl TaskExecutor for CountingExecutor {
///     async fn execute(&self, _t: &TaskType, payload: &Payload) -> Result<TaskOutput, TaskError> {
///         Ok(TaskOutput::Database { records: payload.len() as u32 })
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync + Clone + 'static {
    /// Execute one task and produce its output.
    async fn execute(&self, task_type: &TaskType, payload: &Payload) -> Result<TaskOutput, TaskError>;
}

/// Executor that sleeps for a type-specific latency and produces synthetic output.
///
/// `external_api` fails deterministically on every `external_failure_every`-th
/// call across all clones, modelling an unreliable dependency.
#[derive(Clone)]
pub struct SimulatedExecutor {
    config: Arc<SimulationConfig>,
    external_calls: Arc<AtomicU64>,
}

impl SimulatedExecutor {
    /// Create an executor from the simulation settings.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config: Arc::new(config),
            external_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of `external_api` calls made so far.
    #[must_use]
    pub fn external_calls(&self) -> u64 {
        self.external_calls.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, task_type: &TaskType, _payload: &Payload) -> Result<TaskOutput, TaskError> {
        match task_type {
            TaskType::Compute => {
                tokio::time::sleep(self.config.compute.sample()).await;
                let value = rand::rng().random_range(0..1000);
                Ok(TaskOutput::Compute {
                    computation: "completed".into(),
                    value,
                })
            }
            TaskType::Database => {
                tokio::time::sleep(self.config.database.sample()).await;
                let records = rand::rng().random_range(0..100);
                Ok(TaskOutput::Database { records })
            }
            TaskType::ExternalApi => {
                tokio::time::sleep(self.config.external_api.sample()).await;
                let call = self.external_calls.fetch_add(1, Ordering::Relaxed) + 1;
                if call % self.config.external_failure_every == 0 {
                    return Err(TaskError::SimulatedDependencyFailure(
                        "external API timeout".into(),
                    ));
                }
                Ok(TaskOutput::ExternalApi {
                    status: "success".into(),
                })
            }
            TaskType::Unknown(name) => Err(TaskError::UnknownTaskType(name.clone())),
        }
    }
}
