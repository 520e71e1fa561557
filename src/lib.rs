//! # Taskgate
//!
//! An admission-controlled task processing service built on tokio.
//!
//! Each incoming request passes through a fixed pipeline: an admission permit is
//! acquired, a task is built with a single-use reply slot, the task is pushed onto a
//! bounded queue, one worker of a fixed pool executes it and hands the result back,
//! and the orchestrator returns that result to the caller under a timeout. Shared
//! state (a TTL cache and a metrics aggregator) is guarded by reader/writer locks.
//!
//! ## Key Features
//!
//! - **Admission control**: a counting permit pool bounds in-flight requests
//! - **Bounded queue**: enqueue fails fast with `QueueFull` instead of buffering
//! - **Reply slots**: exactly one `TaskResult` per task, delivered through a oneshot
//! - **TTL cache**: lazy expiry on read plus a periodic background sweep
//! - **Running averages**: per-endpoint latency without storing history
//! - **Graceful shutdown**: stop admitting, drain the queue, then cancel background loops
//! - **Load generator**: concurrent synthetic clients with periodic rate reports
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskgate::builders::build_orchestrator;
//! use taskgate::config::ServiceConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! let shutdown = CancellationToken::new();
//! let service = build_orchestrator(&ServiceConfig::default(), &shutdown)?;
//!
//! let response = service.submit_task("compute", Default::default()).await?;
//! println!("{} -> {:?}", response.task_id, response.result);
//!
//! service.shutdown().await?;
//! ```
//!
//! For complete scenarios, see `tests/orchestrator_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core service components: admission, cache, metrics, processor, orchestrator.
pub mod core;
/// Configuration models for the service and the load generator.
pub mod config;
/// Builders to construct the orchestrator from configuration.
pub mod builders;
/// Infrastructure adapters (bounded task queue).
pub mod infra;
/// Transport-agnostic API surface and the load generator.
pub mod runtime;
/// Shared utilities.
pub mod util;
