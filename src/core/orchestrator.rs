//! Request orchestration: admission, task submission, reply wait, metrics.
//!
//! Every request follows the same path:
//!
//! 1. acquire an admission permit (bounded wait)
//! 2. build a [`Task`] with a fresh reply slot and enqueue it (bounded wait)
//! 3. wait for the worker's reply (bounded wait)
//! 4. record latency plus any error kind, release the permit
//!
//! The permit is an RAII guard, so step 4's release holds on every exit path.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::admission::AdmissionController;
use super::cache::TtlCache;
use super::error::ServiceError;
use super::executor::TaskExecutor;
use super::metrics::{MetricsAggregator, MetricsSnapshot};
use super::processor::{ProcessorConfig, ProcessorStats, TaskProcessor};
use super::task::{Payload, ReplyError, Task, TaskOutput, TaskResult, TaskState, TaskType};
use crate::config::ServiceConfig;
use crate::util::now_secs;

/// Metrics endpoint for task submissions.
pub const SUBMIT_TASK_ENDPOINT: &str = "submit_task";
/// Metrics endpoint for cache lookups.
pub const GET_CACHED_ENDPOINT: &str = "get_cached";

/// Successful task submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Identifier assigned to the task.
    pub task_id: String,
    /// Output produced by the worker.
    pub result: TaskOutput,
    /// Admitted requests at the time the reply arrived, this one included.
    pub active_requests: usize,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValue {
    /// Requested key.
    pub key: String,
    /// Stored or freshly computed value.
    pub value: Value,
    /// `true` on a hit, `false` when the value was computed for this request.
    pub cached: bool,
}

/// Metrics plus processor and admission summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Request, error and latency maps.
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    /// Tasks that reached a terminal state.
    pub tasks_processed: u64,
    /// Currently admitted requests.
    pub active_requests: usize,
    /// Admission bound.
    pub max_concurrent: usize,
    /// Number of workers.
    pub worker_count: usize,
    /// Queue depth and worker counters.
    pub processor: ProcessorStats,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// `healthy`, or `draining` once shutdown has begun.
    pub status: String,
    /// Unix time in seconds.
    pub timestamp: u64,
}

/// Composes admission, cache, metrics and the task processor.
pub struct Orchestrator {
    config: ServiceConfig,
    admission: AdmissionController,
    cache: TtlCache<Value>,
    metrics: Arc<MetricsAggregator>,
    processor: TaskProcessor,
    request_seq: AtomicU64,
    accepting: AtomicBool,
    shutdown: CancellationToken,
    torn_down: CancellationToken,
}

impl Orchestrator {
    /// Validate `config` and start every component on the current runtime.
    ///
    /// Workers and the cache sweep observe a child of `shutdown`, so cancelling
    /// the caller's token stops them too.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidConfig` if the configuration is rejected.
    pub fn start<E: TaskExecutor>(
        config: ServiceConfig,
        executor: E,
        shutdown: &CancellationToken,
    ) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;

        let shutdown = shutdown.child_token();
        let metrics = Arc::new(MetricsAggregator::new());
        let processor = TaskProcessor::start(
            ProcessorConfig {
                worker_count: config.worker_count,
                queue_capacity: config.queue_capacity,
            },
            executor,
            Arc::clone(&metrics),
            &shutdown,
        )?;
        let cache = TtlCache::start(
            config.cache_ttl(),
            config.cache_sweep_interval(),
            &shutdown,
        );

        info!(
            max_concurrent = config.max_concurrent,
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            "service started"
        );

        Ok(Self {
            admission: AdmissionController::new(config.max_concurrent),
            cache,
            metrics,
            processor,
            request_seq: AtomicU64::new(0),
            accepting: AtomicBool::new(true),
            shutdown,
            torn_down: CancellationToken::new(),
            config,
        })
    }

    /// Run one task and wait for its result.
    ///
    /// Latency is recorded under `submit_task` whatever the outcome, and every
    /// error also increments its error counter.
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidInput` for an empty task type
    /// - `ServiceError::AdmissionRejected` if no permit freed up in time
    /// - `ServiceError::QueueFull` if the queue stayed full
    /// - `ServiceError::TaskFailed` if the worker reported a failure
    /// - `ServiceError::ResultTimeout` if no reply arrived within the request timeout
    /// - `ServiceError::ShuttingDown` once shutdown has begun
    pub async fn submit_task(
        &self,
        task_type: &str,
        payload: Payload,
    ) -> Result<TaskResponse, ServiceError> {
        let started = Instant::now();
        let outcome = self.run_task(task_type, payload).await;
        self.finish(SUBMIT_TASK_ENDPOINT, started, outcome)
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// # Errors
    ///
    /// - `ServiceError::MissingKey` for an empty key
    /// - `ServiceError::AdmissionRejected` if no permit freed up in time
    /// - `ServiceError::ShuttingDown` once shutdown has begun
    pub async fn get_cached(&self, key: &str) -> Result<CachedValue, ServiceError> {
        let started = Instant::now();
        let outcome = self.lookup(key).await;
        self.finish(GET_CACHED_ENDPOINT, started, outcome)
    }

    /// Metrics snapshot plus processor and admission summary.
    #[must_use]
    pub fn get_stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            metrics: self.metrics.snapshot(),
            tasks_processed: self.processor.processed_count(),
            active_requests: self.admission.active_count(),
            max_concurrent: self.admission.max_permits(),
            worker_count: self.processor.worker_count(),
            processor: self.processor.stats(),
        }
    }

    /// Liveness indicator.
    #[must_use]
    pub fn health(&self) -> Health {
        let status = if self.is_accepting() {
            "healthy"
        } else {
            "draining"
        };
        Health {
            status: status.to_string(),
            timestamp: now_secs(),
        }
    }

    /// Stop accepting requests, drain the processor, then stop the cache sweep.
    ///
    /// Requests already admitted keep their permits and may still receive
    /// results while the queue drains. Requests still waiting once the service
    /// token is cancelled fail with `ShuttingDown`.
    ///
    /// Only the first call performs the teardown. Later or concurrent calls
    /// wait until it has finished, then return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ShutdownTimeout` if the drain exceeded the configured
    /// bound. The remaining teardown still runs.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        if !self.accepting.swap(false, Ordering::AcqRel) {
            debug!("shutdown already in progress");
            self.torn_down.cancelled().await;
            return Ok(());
        }
        // Releases waiting callers even if this future is dropped midway.
        let _done = self.torn_down.clone().drop_guard();
        info!("shutting down: admission closed");
        self.admission.close();

        let drained = self.processor.stop(self.config.shutdown_timeout()).await;

        self.shutdown.cancel();
        self.cache.stop_sweeper().await;

        match &drained {
            Ok(()) => info!(
                tasks_processed = self.processor.processed_count(),
                "shutdown complete"
            ),
            Err(e) => {
                self.metrics.record_error(e.metric_kind());
                warn!(error = %e, "shutdown finished with errors");
            }
        }
        drained
    }

    /// Whether new requests are accepted. False once [`shutdown`](Self::shutdown)
    /// has begun or the caller's token has been cancelled.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire) && !self.shutdown.is_cancelled()
    }

    /// Shared metrics.
    #[must_use]
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Shared cache.
    #[must_use]
    pub const fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// Configuration the service was started with.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn finish<T>(
        &self,
        endpoint: &str,
        started: Instant,
        outcome: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        self.metrics.record_request(endpoint, started.elapsed());
        if let Err(e) = &outcome {
            self.metrics.record_error(e.metric_kind());
            debug!(endpoint = endpoint, code = e.code(), error = %e, "request failed");
        }
        outcome
    }

    /// Resolve `fut`, or fail with `ShuttingDown` once the service token fires.
    /// A ready `fut` wins, so replies produced by the drain still arrive.
    async fn until_shutdown<F: Future>(&self, fut: F) -> Result<F::Output, ServiceError> {
        tokio::select! {
            biased;
            out = fut => Ok(out),
            () = self.shutdown.cancelled() => Err(ServiceError::ShuttingDown),
        }
    }

    async fn run_task(
        &self,
        task_type: &str,
        payload: Payload,
    ) -> Result<TaskResponse, ServiceError> {
        if !self.is_accepting() {
            return Err(ServiceError::ShuttingDown);
        }
        let task_type = task_type.trim();
        if task_type.is_empty() {
            return Err(ServiceError::InvalidInput("task_type is required".into()));
        }

        let permit = self
            .until_shutdown(self.admission.acquire(self.config.admission_timeout()))
            .await??;

        let seq = self.request_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (task, reply) = Task::new(format!("task-{seq}"), TaskType::from(task_type), payload);
        self.until_shutdown(self.processor.submit(task, self.config.enqueue_timeout()))
            .await??;

        let timeout = self.config.request_timeout();
        let waited = self.until_shutdown(reply.wait(timeout)).await;
        let active_requests = self.admission.active_count();
        permit.release();
        let waited = waited?;

        match waited {
            Ok(TaskResult {
                task_id,
                outcome: Ok(result),
            }) => Ok(TaskResponse {
                task_id,
                result,
                active_requests,
            }),
            Ok(TaskResult {
                task_id,
                outcome: Err(source),
            }) => Err(ServiceError::TaskFailed { task_id, source }),
            Err(ReplyError::TimedOut) => {
                let task_id = format!("task-{seq}");
                warn!(task_id = %task_id, state = %TaskState::TimedOut, "gave up waiting for task result");
                Err(ServiceError::ResultTimeout { task_id, timeout })
            }
            Err(ReplyError::Dropped) => Err(ServiceError::ShuttingDown),
        }
    }

    async fn lookup(&self, key: &str) -> Result<CachedValue, ServiceError> {
        if !self.is_accepting() {
            return Err(ServiceError::ShuttingDown);
        }
        if key.is_empty() {
            return Err(ServiceError::MissingKey);
        }

        let _permit = self
            .until_shutdown(self.admission.acquire(self.config.admission_timeout()))
            .await??;

        if let Some(value) = self.cache.get(key) {
            return Ok(CachedValue {
                key: key.to_string(),
                value,
                cached: true,
            });
        }

        self.until_shutdown(tokio::time::sleep(self.config.simulation.cache_miss.sample()))
            .await?;
        let now = now_secs();
        let value = json!({
            "data": format!("computed_value_{now}"),
            "timestamp": now,
        });
        self.cache.set_default(key, value.clone());

        Ok(CachedValue {
            key: key.to_string(),
            value,
            cached: false,
        })
    }
}
