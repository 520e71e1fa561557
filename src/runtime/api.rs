//! Transport-agnostic request/response models and dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::load_generator::LoadTarget;
use crate::core::{
    CachedValue, Health, Orchestrator, Payload, RetryAdvice, ServiceError, StatsSnapshot,
    TaskResponse,
};

/// Task submission body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    /// Requested task type (`compute`, `database`, `external_api`).
    pub task_type: String,
    /// Arbitrary task input.
    #[serde(default)]
    pub payload: Payload,
}

/// One call against the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    /// Run a task and wait for its result.
    SubmitTask(SubmitTaskRequest),
    /// Look up (or compute) a cached value.
    GetCached {
        /// Cache key.
        #[serde(default)]
        key: String,
    },
    /// Metrics and processor summary.
    GetStats,
    /// Liveness check.
    Health,
}

impl ApiRequest {
    /// Short operation name, used in logs.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::SubmitTask(_) => "submit_task",
            Self::GetCached { .. } => "get_cached",
            Self::GetStats => "get_stats",
            Self::Health => "health",
        }
    }
}

/// Error payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error category, e.g. `service_busy`.
    pub error: String,
    /// Human-readable description.
    pub message: String,
    /// What the caller may safely do next.
    pub retry: RetryAdvice,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            retry: err.retry_advice(),
        }
    }
}

/// Response to an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Task result.
    Task(TaskResponse),
    /// Cache lookup result.
    Cached(CachedValue),
    /// Stats snapshot.
    Stats(Box<StatsSnapshot>),
    /// Liveness report.
    Health(Health),
    /// Any failure.
    Error(ErrorBody),
}

impl ApiResponse {
    /// Whether the call failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Error category, if the call failed.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error(body) => Some(&body.error),
            _ => None,
        }
    }
}

impl From<ServiceError> for ApiResponse {
    fn from(err: ServiceError) -> Self {
        Self::Error(ErrorBody::from(&err))
    }
}

/// Route a request to the matching orchestrator operation.
pub async fn dispatch(service: &Orchestrator, request: ApiRequest) -> ApiResponse {
    match request {
        ApiRequest::SubmitTask(SubmitTaskRequest { task_type, payload }) => service
            .submit_task(&task_type, payload)
            .await
            .map_or_else(ApiResponse::from, ApiResponse::Task),
        ApiRequest::GetCached { key } => service
            .get_cached(&key)
            .await
            .map_or_else(ApiResponse::from, ApiResponse::Cached),
        ApiRequest::GetStats => ApiResponse::Stats(Box::new(service.get_stats())),
        ApiRequest::Health => ApiResponse::Health(service.health()),
    }
}

#[async_trait]
impl LoadTarget for Orchestrator {
    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        dispatch(self, request).await
    }
}
