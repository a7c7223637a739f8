//! Domain types for orders and benchmark parameters
//!
//! Values are validated when they are constructed so that the workflow and
//! the benchmark only ever see well-formed input.

pub mod identifiers;
pub mod order;
pub mod types;

pub use identifiers::OrderId;
pub use order::*;
pub use types::*;
