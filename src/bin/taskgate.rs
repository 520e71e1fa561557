//! Runs the task service under synthetic load, then shuts it down.
//!
//! Configuration comes from `TASKGATE_*` / `TASKGATE_LOAD_*` environment
//! variables (a `.env` file is honoured). Ctrl-C ends the load run early.

use std::sync::Arc;

use anyhow::Context;
use taskgate::builders::build_orchestrator;
use taskgate::config::{LoadConfig, ServiceConfig};
use taskgate::core::AppResult;
use taskgate::runtime::LoadGenerator;
use taskgate::util::init_tracing;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let service_config = ServiceConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading service configuration")?;
    let load_config = LoadConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading load-test configuration")?;

    let shutdown = CancellationToken::new();
    let service = Arc::new(build_orchestrator(&service_config, &shutdown)?);
    let generator = LoadGenerator::new(load_config)?;

    // Ctrl-C only ends the load run; the service still drains through `shutdown()`.
    let stop_load = CancellationToken::new();
    let ctrl_c = stop_load.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C, stopping load");
                ctrl_c.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    let report = generator.run(Arc::clone(&service), &stop_load).await;
    info!(
        requests = report.requests,
        errors = report.errors,
        "load finished, shutting down service"
    );

    let stats = service.get_stats();
    info!(stats = %serde_json::to_string(&stats)?, "final stats");

    service.shutdown().await?;
    shutdown.cancel();
    Ok(())
}
