//! Tests for request dispatch

use taskgate::builders::build_orchestrator;
use taskgate::config::{ServiceConfig, SimulationConfig};
use taskgate::runtime::{dispatch, ApiRequest, ApiResponse, SubmitTaskRequest};
use tokio_util::sync::CancellationToken;

fn service() -> taskgate::core::Orchestrator {
    let config = ServiceConfig {
        queue_capacity: 8,
        worker_count: 2,
        max_concurrent: 4,
        simulation: SimulationConfig::instant(),
        ..ServiceConfig::default()
    };
    build_orchestrator(&config, &CancellationToken::new()).unwrap()
}

#[tokio::test]
async fn test_dispatch_submit_task() {
    let service = service();
    let response = dispatch(
        &service,
        ApiRequest::SubmitTask(SubmitTaskRequest {
            task_type: "compute".into(),
            payload: Default::default(),
        }),
    )
    .await;

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["task_id"], "task-1");
    assert_eq!(json["result"]["kind"], "compute");
    assert_eq!(json["result"]["computation"], "completed");
}

#[tokio::test]
async fn test_dispatch_unknown_type_reports_task_failed() {
    let service = service();
    let response = dispatch(
        &service,
        ApiRequest::SubmitTask(SubmitTaskRequest {
            task_type: "unsupported".into(),
            payload: Default::default(),
        }),
    )
    .await;

    assert!(response.is_error());
    assert_eq!(response.error_code(), Some("task_failed"));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["retry"], "do_not_retry");
}

#[tokio::test]
async fn test_dispatch_missing_key() {
    let service = service();
    let response = dispatch(&service, ApiRequest::GetCached { key: String::new() }).await;
    assert_eq!(response.error_code(), Some("missing_key"));
}

#[tokio::test]
async fn test_dispatch_stats_and_health() {
    let service = service();
    match dispatch(&service, ApiRequest::GetStats).await {
        ApiResponse::Stats(stats) => assert_eq!(stats.worker_count, 2),
        other => panic!("unexpected response {other:?}"),
    }
    match dispatch(&service, ApiRequest::Health).await {
        ApiResponse::Health(health) => assert_eq!(health.status, "healthy"),
        other => panic!("unexpected response {other:?}"),
    }
}
