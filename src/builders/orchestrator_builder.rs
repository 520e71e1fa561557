//! Build an orchestrator from service configuration.

use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::core::{Orchestrator, ServiceError, SimulatedExecutor, TaskExecutor};

/// Build an orchestrator backed by the simulated executor described by
/// `cfg.simulation`. Must be called inside a tokio runtime.
///
/// # Errors
///
/// Returns `ServiceError::InvalidConfig` if validation fails.
pub fn build_orchestrator(
    cfg: &ServiceConfig,
    shutdown: &CancellationToken,
) -> Result<Orchestrator, ServiceError> {
    let executor = SimulatedExecutor::new(cfg.simulation.clone());
    build_orchestrator_with(cfg, executor, shutdown)
}

/// Build an orchestrator around a caller-supplied executor.
///
/// Validation happens once, in [`Orchestrator::start`].
///
/// # Errors
///
/// Returns `ServiceError::InvalidConfig` if validation fails.
pub fn build_orchestrator_with<E: TaskExecutor>(
    cfg: &ServiceConfig,
    executor: E,
    shutdown: &CancellationToken,
) -> Result<Orchestrator, ServiceError> {
    Orchestrator::start(cfg.clone(), executor, shutdown)
}
