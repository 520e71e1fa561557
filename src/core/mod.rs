//! Service components: admission, caching, metrics, task processing and orchestration.

pub mod admission;
pub mod cache;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod task;

pub use admission::{AdmissionController, AdmissionPermit};
pub use cache::{CacheEntry, TtlCache};
pub use error::{AppResult, RetryAdvice, ServiceError, TaskError};
pub use executor::{SimulatedExecutor, TaskExecutor};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use orchestrator::{
    CachedValue, Health, Orchestrator, StatsSnapshot, TaskResponse, GET_CACHED_ENDPOINT,
    SUBMIT_TASK_ENDPOINT,
};
pub use processor::{ProcessorConfig, ProcessorStats, TaskProcessor};
pub use task::{
    Payload, ReplyError, ReplyHandle, ReplySlot, Task, TaskOutput, TaskResult, TaskState, TaskType,
};
