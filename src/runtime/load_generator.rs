//! Concurrent synthetic clients driving a [`LoadTarget`].
//!
//! Each client picks one of the exposed operations at random, issues it, then
//! pauses (think time after success, a short backoff after an error). A reporter
//! logs request/error rates on a fixed interval. The run ends at the configured
//! deadline or when the caller's token is cancelled, whichever comes first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::{ApiRequest, ApiResponse, SubmitTaskRequest};
use crate::config::LoadConfig;
use crate::core::{Payload, ServiceError, TaskType};

/// Something the load generator can send requests to.
#[async_trait]
pub trait LoadTarget: Send + Sync + 'static {
    /// Handle one request.
    async fn handle(&self, request: ApiRequest) -> ApiResponse;
}

/// Totals of a load run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    /// Requests issued.
    pub requests: u64,
    /// Requests that returned an error.
    pub errors: u64,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl LoadReport {
    /// Percentage of requests that succeeded; 100 when nothing was sent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            return 100.0;
        }
        (self.requests - self.errors) as f64 / self.requests as f64 * 100.0
    }

    /// Requests per second over the run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn requests_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.requests as f64 / secs
    }
}

#[derive(Debug, Default)]
struct LoadCounters {
    requests: AtomicU64,
    errors: AtomicU64,
}

impl LoadCounters {
    fn totals(&self) -> (u64, u64) {
        (
            self.requests.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}

/// Runs a fixed number of concurrent clients.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    config: LoadConfig,
}

impl LoadGenerator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidConfig` if `config` is rejected.
    pub fn new(config: LoadConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        Ok(Self { config })
    }

    /// Drive `target` until the configured duration elapses or `cancel` fires,
    /// then wait for every client to finish its current request.
    pub async fn run<T: LoadTarget>(&self, target: Arc<T>, cancel: &CancellationToken) -> LoadReport {
        let stop = cancel.child_token();
        let counters = Arc::new(LoadCounters::default());
        let started = Instant::now();

        info!(
            clients = self.config.clients,
            duration_ms = self.config.duration_ms,
            "starting load test"
        );

        let clients: Vec<_> = (0..self.config.clients)
            .map(|client_id| {
                tokio::spawn(client_loop(
                    client_id,
                    Arc::clone(&target),
                    self.config.clone(),
                    Arc::clone(&counters),
                    stop.clone(),
                ))
            })
            .collect();

        let reporter = tokio::spawn(report_loop(
            self.config.report_interval(),
            Arc::clone(&counters),
            stop.clone(),
        ));

        tokio::select! {
            () = tokio::time::sleep(self.config.duration()) => {}
            () = stop.cancelled() => debug!("load test cancelled"),
        }
        stop.cancel();

        for (client_id, result) in futures::future::join_all(clients).await.into_iter().enumerate() {
            if let Err(e) = result {
                warn!(client_id = client_id, error = %e, "load client ended abnormally");
            }
        }
        if let Err(e) = reporter.await {
            warn!(error = %e, "load reporter ended abnormally");
        }

        let (requests, errors) = counters.totals();
        let report = LoadReport {
            requests,
            errors,
            elapsed: started.elapsed(),
        };
        info!(
            requests = report.requests,
            errors = report.errors,
            success_rate = report.success_rate(),
            rps = report.requests_per_sec(),
            "load test complete"
        );
        report
    }
}

async fn client_loop<T: LoadTarget>(
    client_id: usize,
    target: Arc<T>,
    config: LoadConfig,
    counters: Arc<LoadCounters>,
    stop: CancellationToken,
) {
    while !stop.is_cancelled() {
        let request = random_request(client_id, config.key_space);
        let op = request.op();
        let response = target.handle(request).await;
        counters.requests.fetch_add(1, Ordering::Relaxed);

        let pause = if let Some(code) = response.error_code() {
            counters.errors.fetch_add(1, Ordering::Relaxed);
            debug!(client_id = client_id, op = op, error = code, "load request failed");
            config.error_backoff()
        } else {
            config.think_time.sample()
        };

        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }
}

async fn report_loop(interval: Duration, counters: Arc<LoadCounters>, stop: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                let (requests, errors) = counters.totals();
                info!(
                    requests = requests,
                    errors = errors,
                    error_rate = error_rate(requests, errors),
                    "load test progress"
                );
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn error_rate(requests: u64, errors: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        errors as f64 / requests as f64 * 100.0
    }
}

fn random_request(client_id: usize, key_space: u32) -> ApiRequest {
    let mut rng = rand::rng();
    match rng.random_range(0..3) {
        0 => {
            let pick = rng.random_range(0..TaskType::SUPPORTED.len());
            let task_type = TaskType::SUPPORTED[pick].as_str().to_string();
            let mut payload = Payload::new();
            payload.insert("client".into(), json!(client_id));
            ApiRequest::SubmitTask(SubmitTaskRequest { task_type, payload })
        }
        1 => ApiRequest::GetCached {
            key: format!("key_{}", rng.random_range(0..key_space)),
        },
        _ => ApiRequest::GetStats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_rates() {
        let report = LoadReport {
            requests: 200,
            errors: 50,
            elapsed: Duration::from_secs(4),
        };
        assert!((report.success_rate() - 75.0).abs() < 1e-9);
        assert!((report.requests_per_sec() - 50.0).abs() < 1e-9);

        let empty = LoadReport {
            requests: 0,
            errors: 0,
            elapsed: Duration::ZERO,
        };
        assert!((empty.success_rate() - 100.0).abs() < 1e-9);
        assert!(empty.requests_per_sec().abs() < 1e-9);
    }

    #[test]
    fn test_random_requests_stay_in_key_space() {
        for _ in 0..200 {
            match random_request(3, 4) {
                ApiRequest::GetCached { key } => {
                    let n: u32 = key.trim_start_matches("key_").parse().unwrap();
                    assert!(n < 4);
                }
                ApiRequest::SubmitTask(body) => {
                    assert!(TaskType::SUPPORTED
                        .iter()
                        .any(|t| t.as_str() == body.task_type));
                    assert_eq!(body.payload["client"], 3);
                }
                ApiRequest::GetStats => {}
                ApiRequest::Health => panic!("health is not part of the load mix"),
            }
        }
    }
}
