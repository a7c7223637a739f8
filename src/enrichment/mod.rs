//! Order workflows
//!
//! [`OrderEnrichmentService`] runs the concurrent validate-and-price flow;
//! [`OrderService`] covers plain listing, lookup and creation.

pub mod error;
pub mod orders;
pub mod service;

pub use error::WorkflowError;
pub use orders::OrderService;
pub use service::OrderEnrichmentService;
