//! Tests for configuration validation

use taskgate::config::{LatencyRange, LoadConfig, ServiceConfig, SimulationConfig};

#[test]
fn test_service_config_defaults() {
    let config = ServiceConfig::default();
    assert_eq!(config.queue_capacity, 1000);
    assert_eq!(config.worker_count, 50);
    assert_eq!(config.max_concurrent, 100);
    assert_eq!(config.request_timeout().as_secs(), 5);
    assert_eq!(config.cache_ttl().as_secs(), 30);
    assert_eq!(config.cache_sweep_interval().as_secs(), 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_service_config_invalid_queue_capacity() {
    let invalid = ServiceConfig {
        queue_capacity: 0,
        ..ServiceConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_service_config_invalid_worker_count() {
    let invalid = ServiceConfig {
        worker_count: 0,
        ..ServiceConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_service_config_rejects_unbounded_concurrency() {
    let invalid = ServiceConfig {
        max_concurrent: usize::MAX,
        ..ServiceConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("max_concurrent"), "{err}");

    let at_limit = ServiceConfig {
        max_concurrent: tokio::sync::Semaphore::MAX_PERMITS,
        ..ServiceConfig::default()
    };
    assert!(at_limit.validate().is_ok());
}

#[test]
fn test_service_config_invalid_timeout() {
    let invalid = ServiceConfig {
        request_timeout_ms: 0,
        ..ServiceConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("request_timeout_ms"), "{err}");
}

#[test]
fn test_zero_admission_timeout_is_allowed() {
    let config = ServiceConfig {
        admission_timeout_ms: 0,
        ..ServiceConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_simulation_failure_modulus_must_be_positive() {
    let invalid = ServiceConfig {
        simulation: SimulationConfig {
            external_failure_every: 0,
            ..SimulationConfig::default()
        },
        ..ServiceConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_service_config_from_json() {
    let json = r#"{
        "queue_capacity": 16,
        "worker_count": 4,
        "max_concurrent": 8,
        "simulation": { "compute": { "min_ms": 1, "max_ms": 2 } }
    }"#;

    let config = ServiceConfig::from_json_str(json).unwrap();
    assert_eq!(config.queue_capacity, 16);
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.simulation.compute, LatencyRange::new(1, 2));
    // Unspecified fields keep their defaults.
    assert_eq!(config.request_timeout_ms, 5_000);
    assert_eq!(config.simulation.database, LatencyRange::new(100, 300));
}

#[test]
fn test_service_config_from_json_rejects_invalid() {
    assert!(ServiceConfig::from_json_str(r#"{"max_concurrent": 0}"#).is_err());
    assert!(ServiceConfig::from_json_str("not json").is_err());
}

#[test]
fn test_load_config_defaults() {
    let config = LoadConfig::default();
    assert_eq!(config.clients, 200);
    assert_eq!(config.duration().as_secs(), 30);
    assert_eq!(config.report_interval().as_secs(), 2);
    assert_eq!(config.think_time, LatencyRange::new(10, 30));
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_config_invalid() {
    let invalid = LoadConfig {
        clients: 0,
        ..LoadConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = LoadConfig {
        think_time: LatencyRange::new(30, 10),
        ..LoadConfig::default()
    };
    assert!(invalid.validate().is_err());
}
