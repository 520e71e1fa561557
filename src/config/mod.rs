//! Configuration models for the service and the load generator.

pub mod load;
pub mod service;

pub use load::LoadConfig;
pub use service::{LatencyRange, ServiceConfig, SimulationConfig};
