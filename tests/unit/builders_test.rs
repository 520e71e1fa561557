//! Tests for builder modules

use taskgate::builders::{build_orchestrator, build_orchestrator_with};
use taskgate::config::{ServiceConfig, SimulationConfig};
use taskgate::core::{ServiceError, SimulatedExecutor};
use tokio_util::sync::CancellationToken;

fn small_config() -> ServiceConfig {
    ServiceConfig {
        queue_capacity: 4,
        worker_count: 2,
        max_concurrent: 3,
        simulation: SimulationConfig::instant(),
        ..ServiceConfig::default()
    }
}

#[tokio::test]
async fn test_build_orchestrator_from_config() {
    let shutdown = CancellationToken::new();
    let service = build_orchestrator(&small_config(), &shutdown).unwrap();

    let stats = service.get_stats();
    assert_eq!(stats.worker_count, 2);
    assert_eq!(stats.max_concurrent, 3);
    assert_eq!(service.config().queue_capacity, 4);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_build_orchestrator_rejects_invalid_config() {
    let config = ServiceConfig {
        worker_count: 0,
        ..small_config()
    };
    let result = build_orchestrator(&config, &CancellationToken::new());
    match result {
        Err(ServiceError::InvalidConfig(msg)) => {
            assert_eq!(msg, "worker_count must be greater than 0");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("invalid config accepted"),
    }
}

#[tokio::test]
async fn test_build_with_rejects_invalid_config() {
    let config = ServiceConfig {
        max_concurrent: usize::MAX,
        ..small_config()
    };
    let executor = SimulatedExecutor::new(config.simulation.clone());
    let result = build_orchestrator_with(&config, executor, &CancellationToken::new());
    match result {
        Err(ServiceError::InvalidConfig(msg)) => assert!(msg.starts_with("max_concurrent"), "{msg}"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("invalid config accepted"),
    }
}

#[tokio::test]
async fn test_build_with_custom_executor() {
    let config = small_config();
    let executor = SimulatedExecutor::new(config.simulation.clone());
    let service = build_orchestrator_with(&config, executor.clone(), &CancellationToken::new()).unwrap();

    service
        .submit_task("external_api", Default::default())
        .await
        .unwrap();
    assert_eq!(executor.external_calls(), 1);
    service.shutdown().await.unwrap();
}
