//! Plain order operations that need no fan-out

use crate::domain::{CreateOrderRequest, NewOrder, Order, OrderId, Quantity, Ticker};
use crate::enrichment::WorkflowError;
use crate::infrastructure::OrderRepository;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> Result<Vec<Order>, WorkflowError> {
        self.repository.find_all().await
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, WorkflowError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("Order {id} does not exist")))
    }

    /// Store an order with a caller-supplied price
    #[instrument(skip(self), fields(ticker = %request.ticker))]
    pub async fn create(&self, request: CreateOrderRequest) -> Result<Order, WorkflowError> {
        let ticker = Ticker::try_new(request.ticker.as_str())
            .map_err(|e| WorkflowError::validation(format!("Invalid ticker: {e}")))?;
        let quantity = Quantity::from_wire(request.quantity).map_err(WorkflowError::validation)?;
        if request.price <= Decimal::ZERO {
            return Err(WorkflowError::validation("price must be > 0"));
        }

        let saved = self
            .repository
            .save(NewOrder::new(ticker, quantity, request.price))
            .await?;
        info!(order_id = %saved.id, "Order created");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryOrderRepository;
    use rstest::rstest;

    fn service() -> OrderService {
        OrderService::new(Arc::new(InMemoryOrderRepository::new()))
    }

    fn request(ticker: &str, quantity: i64, price: Decimal) -> CreateOrderRequest {
        CreateOrderRequest {
            ticker: ticker.to_string(),
            quantity,
            price,
        }
    }

    #[tokio::test]
    async fn created_orders_are_listed_and_fetchable() {
        let service = service();
        let created = service
            .create(request("ETHUSDT", 3, Decimal::new(250_050, 2)))
            .await
            .unwrap();

        assert_eq!(service.list().await.unwrap(), vec![created.clone()]);
        assert_eq!(service.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let err = service().get(OrderId::generate()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[rstest]
    #[case("", 1, Decimal::ONE)]
    #[case("ETHUSDT", 0, Decimal::ONE)]
    #[case("ETHUSDT", 1, Decimal::ZERO)]
    #[case("ETHUSDT", 1, Decimal::NEGATIVE_ONE)]
    #[tokio::test]
    async fn bad_fields_are_rejected(
        #[case] ticker: &str,
        #[case] quantity: i64,
        #[case] price: Decimal,
    ) {
        let service = service();
        let err = service
            .create(request(ticker, quantity, price))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)), "{err:?}");
        assert!(service.list().await.unwrap().is_empty());
    }
}
