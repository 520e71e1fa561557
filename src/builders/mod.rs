//! Builders that turn configuration into a running service.

pub mod orchestrator_builder;

pub use orchestrator_builder::{build_orchestrator, build_orchestrator_with};
