//! Order Scope - structured concurrency for order enrichment
//!
//! Two pieces share one concurrency vocabulary:
//!
//! - a benchmark contrasting one OS thread per unit of blocking work with
//!   tokio tasks on a small carrier pool, sampling memory and OS threads
//! - an order enrichment workflow that validates a ticker and fetches its
//!   price as sibling subtasks of one cancellation scope, failing fast and
//!   persisting only when both succeed

pub mod api;
pub mod application;
pub mod benchmark;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod infrastructure;

pub use application::Application;
pub use error::{Error, Result};
