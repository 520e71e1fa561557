//! Infrastructure adapters for task transport.

pub mod queue;

pub use queue::{BoundedQueue, QueueError};
