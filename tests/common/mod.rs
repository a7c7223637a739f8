//! Shared doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use order_scope::domain::{NewOrder, Order, OrderId, Quantity, Ticker};
use order_scope::enrichment::WorkflowError;
use order_scope::infrastructure::{InMemoryOrderRepository, OrderRepository};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PRICE_PATH: &str = "/api/v3/ticker/price";

/// In-memory store that counts `save` calls and can be told to fail them
pub struct RecordingRepository {
    inner: InMemoryOrderRepository,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl RecordingRepository {
    pub fn seeded(tickers: &[&str]) -> Self {
        let orders = tickers.iter().map(|ticker| seed_order(ticker)).collect::<Vec<_>>();
        Self {
            inner: InMemoryOrderRepository::with_orders(orders),
            saves: AtomicUsize::new(0),
            fail_saves: false,
        }
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderRepository for RecordingRepository {
    async fn save(&self, order: NewOrder) -> Result<Order, WorkflowError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(WorkflowError::persistence("disk full"));
        }
        self.inner.save(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, WorkflowError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Order>, WorkflowError> {
        self.inner.find_all().await
    }

    async fn exists_by_ticker(&self, ticker: &Ticker) -> Result<bool, WorkflowError> {
        self.inner.exists_by_ticker(ticker).await
    }
}

pub fn seed_order(ticker: &str) -> Order {
    NewOrder::new(
        Ticker::try_new(ticker).unwrap(),
        Quantity::try_new(1).unwrap(),
        Decimal::ONE,
    )
    .with_id(OrderId::generate())
}
