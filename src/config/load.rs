//! Load generator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::service::{env_override, LatencyRange};

/// Settings for the synthetic client harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Number of concurrent simulated clients.
    pub clients: usize,
    /// Overall run time, in milliseconds.
    pub duration_ms: u64,
    /// Interval between rate snapshots, in milliseconds.
    pub report_interval_ms: u64,
    /// Pause between consecutive requests of one client.
    pub think_time: LatencyRange,
    /// Number of distinct cache keys clients pick from.
    pub key_space: u32,
    /// Pause after a failed request, in milliseconds.
    pub error_backoff_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            clients: 200,
            duration_ms: 30_000,
            report_interval_ms: 2_000,
            think_time: LatencyRange::new(10, 30),
            key_space: 10,
            error_backoff_ms: 10,
        }
    }
}

impl LoadConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.clients == 0 {
            return Err("clients must be greater than 0".into());
        }
        if self.duration_ms == 0 {
            return Err("duration_ms must be greater than 0".into());
        }
        if self.report_interval_ms == 0 {
            return Err("report_interval_ms must be greater than 0".into());
        }
        if self.key_space == 0 {
            return Err("key_space must be greater than 0".into());
        }
        self.think_time
            .validate()
            .map_err(|e| format!("think_time: {e}"))
    }

    /// Build configuration from defaults overridden by `TASKGATE_LOAD_*`
    /// environment variables.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        env_override("TASKGATE_LOAD_CLIENTS", &mut cfg.clients)?;
        env_override("TASKGATE_LOAD_DURATION_MS", &mut cfg.duration_ms)?;
        env_override("TASKGATE_LOAD_REPORT_INTERVAL_MS", &mut cfg.report_interval_ms)?;
        env_override("TASKGATE_LOAD_KEY_SPACE", &mut cfg.key_space)?;
        env_override("TASKGATE_LOAD_ERROR_BACKOFF_MS", &mut cfg.error_backoff_ms)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overall run time.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Interval between rate snapshots.
    #[must_use]
    pub const fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Pause after a failed request.
    #[must_use]
    pub const fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}
