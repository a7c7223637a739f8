//! PostgreSQL-backed order repository
//!
//! Expects an `orders` table with columns
//! `id uuid, ticker text, quantity int4, price numeric, created_at timestamptz`.

use crate::domain::{NewOrder, Order, OrderId, Quantity, Ticker};
use crate::enrichment::WorkflowError;
use crate::infrastructure::repository::OrderRepository;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, ticker, quantity, price, created_at";

/// Order repository over a sqlx connection pool
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;

        let health_check: i32 = row.try_get("health_check")?;

        if health_check == 1 {
            Ok(())
        } else {
            Err(crate::Error::application("Database health check failed"))
        }
    }
}

fn order_from_row(row: &PgRow) -> std::result::Result<Order, WorkflowError> {
    let id: Uuid = row.try_get("id")?;
    let ticker: String = row.try_get("ticker")?;
    let quantity: i32 = row.try_get("quantity")?;
    let price: Decimal = row.try_get("price")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Order {
        id: OrderId::new(id),
        ticker: Ticker::try_new(ticker)
            .map_err(|e| WorkflowError::persistence(format!("stored ticker is invalid: {e}")))?,
        quantity: Quantity::try_new(quantity)
            .map_err(|e| WorkflowError::persistence(format!("stored quantity is invalid: {e}")))?,
        price,
        created_at,
    })
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn save(&self, order: NewOrder) -> std::result::Result<Order, WorkflowError> {
        let order = order.with_id(OrderId::generate());
        let query = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5) RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(*order.id.as_ref())
            .bind(order.ticker.as_ref())
            .bind(*order.quantity.as_ref())
            .bind(order.price)
            .bind(order.created_at)
            .fetch_one(&self.pool)
            .await?;

        order_from_row(&row)
    }

    async fn find_by_id(&self, id: OrderId) -> std::result::Result<Option<Order>, WorkflowError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(*id.as_ref())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_all(&self) -> std::result::Result<Vec<Order>, WorkflowError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at, id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn exists_by_ticker(&self, ticker: &Ticker) -> std::result::Result<bool, WorkflowError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM orders WHERE ticker = $1) AS present")
            .bind(ticker.as_ref())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("present")?)
    }
}
