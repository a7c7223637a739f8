//! Application services and business logic orchestration
//!
//! This module wires configuration, storage, the price client and the HTTP
//! router together, and sets up logging.

pub mod app;
pub mod telemetry;

pub use app::Application;
pub use telemetry::init_tracing;
