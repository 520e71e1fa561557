//! Service configuration structures.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive millisecond range used for simulated latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

impl LatencyRange {
    /// Range between two bounds.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields the same latency.
    #[must_use]
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draw a latency uniformly from the range.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }

    /// Validate that the bounds are ordered.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_ms > self.max_ms {
            return Err(format!(
                "min_ms ({}) must not exceed max_ms ({})",
                self.min_ms, self.max_ms
            ));
        }
        Ok(())
    }
}

/// Simulated cost and failure model for each task type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Latency of `compute` tasks.
    pub compute: LatencyRange,
    /// Latency of `database` tasks.
    pub database: LatencyRange,
    /// Latency of `external_api` tasks.
    pub external_api: LatencyRange,
    /// Latency of the computation behind a cache miss.
    pub cache_miss: LatencyRange,
    /// Every n-th `external_api` call fails.
    pub external_failure_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            compute: LatencyRange::new(50, 150),
            database: LatencyRange::new(100, 300),
            external_api: LatencyRange::new(200, 500),
            cache_miss: LatencyRange::new(100, 300),
            external_failure_every: 10,
        }
    }
}

impl SimulationConfig {
    /// Zero-latency model, handy for tests and benchmarks.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            compute: LatencyRange::fixed(0),
            database: LatencyRange::fixed(0),
            external_api: LatencyRange::fixed(0),
            cache_miss: LatencyRange::fixed(0),
            ..Self::default()
        }
    }

    /// Validate latency ranges and the failure modulus.
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in [
            ("compute", &self.compute),
            ("database", &self.database),
            ("external_api", &self.external_api),
            ("cache_miss", &self.cache_miss),
        ] {
            range
                .validate()
                .map_err(|e| format!("simulation.{name}: {e}"))?;
        }
        if self.external_failure_every == 0 {
            return Err("simulation.external_failure_every must be greater than 0".into());
        }
        Ok(())
    }
}

/// Service configuration, fixed at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Maximum queued tasks before enqueue starts failing.
    pub queue_capacity: usize,
    /// Number of workers pulling from the queue.
    pub worker_count: usize,
    /// Maximum concurrently admitted requests.
    pub max_concurrent: usize,
    /// Overall wait for a task result, in milliseconds.
    pub request_timeout_ms: u64,
    /// Default cache entry lifetime, in milliseconds.
    pub cache_ttl_ms: u64,
    /// Interval between background cache sweeps, in milliseconds.
    pub cache_sweep_interval_ms: u64,
    /// Wait for an admission permit, in milliseconds.
    pub admission_timeout_ms: u64,
    /// Wait for queue space, in milliseconds.
    pub enqueue_timeout_ms: u64,
    /// Bound on draining the processor during shutdown, in milliseconds.
    pub shutdown_timeout_ms: u64,
    /// Simulated task cost model.
    pub simulation: SimulationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            worker_count: 50,
            max_concurrent: 100,
            request_timeout_ms: 5_000,
            cache_ttl_ms: 30_000,
            cache_sweep_interval_ms: 10_000,
            admission_timeout_ms: 2_000,
            enqueue_timeout_ms: 100,
            shutdown_timeout_ms: 10_000,
            simulation: SimulationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.max_concurrent > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_concurrent must not exceed {}",
                tokio::sync::Semaphore::MAX_PERMITS
            ));
        }
        for (name, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("cache_ttl_ms", self.cache_ttl_ms),
            ("cache_sweep_interval_ms", self.cache_sweep_interval_ms),
            ("enqueue_timeout_ms", self.enqueue_timeout_ms),
            ("shutdown_timeout_ms", self.shutdown_timeout_ms),
        ] {
            if value == 0 {
                return Err(format!("{name} must be greater than 0"));
            }
        }
        self.simulation.validate()
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `TASKGATE_*` environment
    /// variables, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        env_override("TASKGATE_QUEUE_CAPACITY", &mut cfg.queue_capacity)?;
        env_override("TASKGATE_WORKER_COUNT", &mut cfg.worker_count)?;
        env_override("TASKGATE_MAX_CONCURRENT", &mut cfg.max_concurrent)?;
        env_override("TASKGATE_REQUEST_TIMEOUT_MS", &mut cfg.request_timeout_ms)?;
        env_override("TASKGATE_CACHE_TTL_MS", &mut cfg.cache_ttl_ms)?;
        env_override(
            "TASKGATE_CACHE_SWEEP_INTERVAL_MS",
            &mut cfg.cache_sweep_interval_ms,
        )?;
        env_override("TASKGATE_ADMISSION_TIMEOUT_MS", &mut cfg.admission_timeout_ms)?;
        env_override("TASKGATE_ENQUEUE_TIMEOUT_MS", &mut cfg.enqueue_timeout_ms)?;
        env_override("TASKGATE_SHUTDOWN_TIMEOUT_MS", &mut cfg.shutdown_timeout_ms)?;
        env_override(
            "TASKGATE_EXTERNAL_FAILURE_EVERY",
            &mut cfg.simulation.external_failure_every,
        )?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Per-request result wait.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Default cache TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Background sweep period.
    #[must_use]
    pub const fn cache_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cache_sweep_interval_ms)
    }

    /// Admission permit wait.
    #[must_use]
    pub const fn admission_timeout(&self) -> Duration {
        Duration::from_millis(self.admission_timeout_ms)
    }

    /// Queue space wait.
    #[must_use]
    pub const fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    /// Drain bound used by shutdown.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Overwrite `target` with the parsed value of `name` when it is set.
pub(crate) fn env_override<T>(name: &str, target: &mut T) -> Result<(), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| format!("{name}={raw:?} is invalid: {e}"))?;
    }
    Ok(())
}
