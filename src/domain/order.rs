//! Order records and the request/response shapes built around them

use crate::domain::{OrderId, Quantity, Ticker};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub ticker: Ticker,
    pub quantity: Quantity,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An order that has not been assigned an identity yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub ticker: Ticker,
    pub quantity: Quantity,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(ticker: Ticker, quantity: Quantity, price: Decimal) -> Self {
        Self {
            ticker,
            quantity,
            price,
            created_at: Utc::now(),
        }
    }

    /// Attach an identity, producing the stored form
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            ticker: self.ticker,
            quantity: self.quantity,
            price: self.price,
            created_at: self.created_at,
        }
    }
}

/// Input of the enrichment workflow as received from callers
///
/// Fields stay unvalidated here so that a bad value surfaces as a
/// validation failure of the workflow rather than a decoding error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub ticker: String,
    pub quantity: i64,
}

impl EnrichmentRequest {
    pub fn new(ticker: impl Into<String>, quantity: i64) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
        }
    }
}

/// Input of the plain create endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub ticker: String,
    pub quantity: i64,
    pub price: Decimal,
}

/// Result of a successful enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedOrder {
    pub id: OrderId,
    pub ticker: Ticker,
    pub quantity: Quantity,
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
    /// Which execution context served the request
    pub serving_context: String,
}

impl EnrichedOrder {
    pub fn from_saved(order: Order, serving_context: impl Into<String>) -> Self {
        Self {
            id: order.id,
            ticker: order.ticker,
            quantity: order.quantity,
            final_price: order.price,
            created_at: order.created_at,
            serving_context: serving_context.into(),
        }
    }
}
