//! Infrastructure layer for Order Scope
//!
//! This module contains the implementations for external concerns: order
//! storage and the HTTP client for the remote price service.

pub mod postgres;
pub mod price_client;
pub mod repository;

pub use postgres::PgOrderRepository;
pub use price_client::{HttpPriceClient, PriceSource};
pub use repository::{InMemoryOrderRepository, OrderRepository};
