//! Order enrichment: validate and price an order concurrently, then persist it

use crate::concurrency::{ExecutionContext, TaskScope};
use crate::domain::{EnrichedOrder, EnrichmentRequest, NewOrder, Quantity, Ticker};
use crate::enrichment::WorkflowError;
use crate::infrastructure::{OrderRepository, PriceSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

const CONTEXT_LABEL: &str = "orders/enrich";

/// Runs the enrichment workflow against a shared store and price source
#[derive(Clone)]
pub struct OrderEnrichmentService {
    repository: Arc<dyn OrderRepository>,
    prices: Arc<dyn PriceSource>,
    scope_deadline: Option<Duration>,
}

impl OrderEnrichmentService {
    pub fn new(repository: Arc<dyn OrderRepository>, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            repository,
            prices,
            scope_deadline: None,
        }
    }

    /// Bound the fan-out join; an elapsed deadline fails as upstream
    pub fn with_scope_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.scope_deadline = deadline;
        self
    }

    /// Validate `request`, fetch its price and persist the priced order
    ///
    /// The ticker existence check and the price fetch run as two subtasks of
    /// one scope. The first failure cancels the other subtask, and nothing is
    /// saved unless both succeed.
    #[instrument(skip(self), fields(ticker = %request.ticker, quantity = request.quantity))]
    pub async fn create_enriched(
        &self,
        request: EnrichmentRequest,
    ) -> Result<EnrichedOrder, WorkflowError> {
        let (ticker, quantity) = validate_request(&request)?;

        let context = ExecutionContext::lightweight(CONTEXT_LABEL);
        let mut scope: TaskScope<WorkflowError> = TaskScope::new(context.clone());

        let repository = Arc::clone(&self.repository);
        let known = ticker.clone();
        let validated = scope.fork("validate", move |_| async move {
            if repository.exists_by_ticker(&known).await? {
                Ok(())
            } else {
                Err(WorkflowError::not_found(format!("Unknown ticker {known}")))
            }
        });

        let prices = Arc::clone(&self.prices);
        let priced = ticker.clone();
        let price = scope.fork("fetch-price", move |_| async move {
            prices.fetch_price(&priced).await
        });

        // A deadline past the clock's range is the same as no deadline
        let until = self
            .scope_deadline
            .and_then(|deadline| Some((deadline, Instant::now().checked_add(deadline)?)));
        let outcome = match until {
            Some((deadline, at)) => {
                scope
                    .join_until(at, move || {
                        WorkflowError::upstream(format!(
                            "Enrichment did not finish within {deadline:?}"
                        ))
                    })
                    .await
            }
            None => scope.join().await,
        };

        let joined = outcome.into_result().inspect_err(|error| {
            warn!(code = error.code(), %error, "Enrichment failed");
        })?;
        drop(validated);
        let price = joined
            .take(price)
            .ok_or_else(|| WorkflowError::upstream("Price subtask produced no value"))?;

        let saved = self
            .repository
            .save(NewOrder::new(ticker, quantity, price))
            .await?;

        info!(order_id = %saved.id, price = %saved.price, "Order enriched");
        Ok(EnrichedOrder::from_saved(saved, context.to_string()))
    }
}

fn validate_request(request: &EnrichmentRequest) -> Result<(Ticker, Quantity), WorkflowError> {
    let ticker = Ticker::try_new(request.ticker.as_str())
        .map_err(|e| WorkflowError::validation(format!("Invalid ticker: {e}")))?;
    let quantity = Quantity::from_wire(request.quantity).map_err(WorkflowError::validation)?;
    Ok((ticker, quantity))
}
