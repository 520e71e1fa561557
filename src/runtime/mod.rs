//! Request/response surface and the load generator built on it.

pub mod api;
pub mod load_generator;

pub use api::{dispatch, ApiRequest, ApiResponse, ErrorBody, SubmitTaskRequest};
pub use load_generator::{LoadGenerator, LoadReport, LoadTarget};
