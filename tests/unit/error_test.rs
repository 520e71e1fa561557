//! Tests for error types

use std::time::Duration;

use taskgate::core::{RetryAdvice, ServiceError, TaskError};

#[test]
fn test_admission_rejected_error() {
    let err = ServiceError::AdmissionRejected {
        waited: Duration::from_millis(250),
    };
    assert_eq!(
        format!("{err}"),
        "admission rejected: no permit available within 250ms"
    );
    assert_eq!(err.retry_advice(), RetryAdvice::Retry);
}

#[test]
fn test_shutdown_timeout_error() {
    let err = ServiceError::ShutdownTimeout {
        timeout: Duration::from_secs(10),
    };
    assert_eq!(format!("{err}"), "shutdown did not complete within 10s");
    assert_eq!(err.code(), "shutdown_timeout");
    assert_eq!(err.retry_advice(), RetryAdvice::DoNotRetry);
}

#[test]
fn test_delivery_timeout_error() {
    let err = ServiceError::DeliveryTimeout {
        task_id: "task-3".into(),
    };
    assert_eq!(err.code(), "result_lost");
    assert_eq!(err.metric_kind(), "delivery_timeout");
    assert_eq!(err.retry_advice(), RetryAdvice::IdempotentRetry);
}

#[test]
fn test_external_failure_message() {
    let err = TaskError::SimulatedDependencyFailure("external API timeout".into());
    assert_eq!(format!("{err}"), "dependency failure: external API timeout");
}

#[test]
fn test_caller_errors_have_stable_codes() {
    assert_eq!(ServiceError::MissingKey.code(), "missing_key");
    assert_eq!(ServiceError::ShuttingDown.code(), "shutting_down");
    assert_eq!(
        ServiceError::InvalidInput("task_type is required".into()).code(),
        "invalid_input"
    );
}

#[test]
fn test_retry_advice_serializes_snake_case() {
    let json = serde_json::to_string(&RetryAdvice::IdempotentRetry).unwrap();
    assert_eq!(json, "\"idempotent_retry\"");
}
