//! Order persistence port and its in-memory implementation

use crate::domain::{NewOrder, Order, OrderId, Ticker};
use crate::enrichment::WorkflowError;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Durable store of orders
///
/// Implementations must be safe for concurrent independent calls; the
/// workflow shares one instance across all in-flight requests.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order, assigning its identity
    async fn save(&self, order: NewOrder) -> Result<Order, WorkflowError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, WorkflowError>;

    async fn find_all(&self) -> Result<Vec<Order>, WorkflowError>;

    /// Whether any stored order references `ticker`
    async fn exists_by_ticker(&self, ticker: &Ticker) -> Result<bool, WorkflowError>;
}

/// Process-local store, used when no database is configured and in tests
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-built orders as-is
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: RwLock::new(orders.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: NewOrder) -> Result<Order, WorkflowError> {
        let saved = order.with_id(OrderId::generate());
        self.orders.write().push(saved.clone());
        Ok(saved)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, WorkflowError> {
        Ok(self.orders.read().iter().find(|o| o.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>, WorkflowError> {
        Ok(self.orders.read().clone())
    }

    async fn exists_by_ticker(&self, ticker: &Ticker) -> Result<bool, WorkflowError> {
        Ok(self.orders.read().iter().any(|o| &o.ticker == ticker))
    }
}
