//! Request counters, error counters and running latency averages.
//!
//! Request metrics (count + average) and error counters live behind two
//! independent reader/writer locks. A request count and its average are always
//! updated under the same write guard, so no reader can see one without the other.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct RequestMetrics {
    count: HashMap<String, u64>,
    avg_ms: HashMap<String, f64>,
}

/// Deep copy of all metrics taken at a single point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Completed requests per endpoint.
    pub request_count: HashMap<String, u64>,
    /// Occurrences per error kind.
    pub error_count: HashMap<String, u64>,
    /// Mean response time per endpoint, in milliseconds.
    pub avg_response_time: HashMap<String, f64>,
}

/// Thread-safe metrics shared by the orchestrator and the workers.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    requests: RwLock<RequestMetrics>,
    errors: RwLock<HashMap<String, u64>>,
}

impl MetricsAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a completed request and fold `duration` into the endpoint's mean.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_request(&self, endpoint: &str, duration: Duration) {
        let sample_ms = duration.as_secs_f64() * 1000.0;
        let mut requests = self.requests.write();

        let count = requests.count.entry(endpoint.to_string()).or_insert(0);
        *count += 1;
        let n = *count as f64;

        let avg = requests.avg_ms.entry(endpoint.to_string()).or_insert(0.0);
        *avg = (*avg * (n - 1.0) + sample_ms) / n;
    }

    /// Count one occurrence of an error kind.
    pub fn record_error(&self, kind: &str) {
        *self.errors.write().entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Copy all three maps. Both read guards are held together so the copy
    /// reflects a single instant.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.read();
        let errors = self.errors.read();
        MetricsSnapshot {
            request_count: requests.count.clone(),
            error_count: errors.clone(),
            avg_response_time: requests.avg_ms.clone(),
        }
    }

    /// Requests recorded for `endpoint`.
    #[must_use]
    pub fn request_count(&self, endpoint: &str) -> u64 {
        self.requests.read().count.get(endpoint).copied().unwrap_or(0)
    }

    /// Occurrences recorded for `kind`.
    #[must_use]
    pub fn error_count(&self, kind: &str) -> u64 {
        self.errors.read().get(kind).copied().unwrap_or(0)
    }

    /// Mean latency for `endpoint` in milliseconds, if any request was recorded.
    #[must_use]
    pub fn average_ms(&self, endpoint: &str) -> Option<f64> {
        self.requests.read().avg_ms.get(endpoint).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_running_average_matches_mean() {
        let metrics = MetricsAggregator::new();
        for ms in [10, 20, 30, 40] {
            metrics.record_request("/a", Duration::from_millis(ms));
        }
        assert_eq!(metrics.request_count("/a"), 4);
        let avg = metrics.average_ms("/a").unwrap();
        assert!((avg - 25.0).abs() < 1e-9, "avg was {avg}");
    }

    #[test]
    fn test_error_counts() {
        let metrics = MetricsAggregator::new();
        metrics.record_error("queue_full");
        metrics.record_error("queue_full");
        metrics.record_error("task_failed");
        assert_eq!(metrics.error_count("queue_full"), 2);
        assert_eq!(metrics.error_count("task_failed"), 1);
        assert_eq!(metrics.error_count("missing"), 0);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let metrics = MetricsAggregator::new();
        metrics.record_request("/a", Duration::from_millis(5));
        let snap = metrics.snapshot();
        metrics.record_request("/a", Duration::from_millis(5));
        assert_eq!(snap.request_count["/a"], 1);
        assert_eq!(metrics.request_count("/a"), 2);
    }

    #[test]
    fn test_concurrent_recorders_on_other_endpoints() {
        let metrics = Arc::new(MetricsAggregator::new());
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                let endpoint = format!("/e{t}");
                for i in 1..=100u64 {
                    metrics.record_request(&endpoint, Duration::from_millis(i));
                    metrics.record_error("noise");
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let snap = metrics.snapshot();
        for t in 0..4 {
            let endpoint = format!("/e{t}");
            assert_eq!(snap.request_count[&endpoint], 100);
            assert!((snap.avg_response_time[&endpoint] - 50.5).abs() < 1e-6);
        }
        assert_eq!(snap.error_count["noise"], 400);
    }
}
