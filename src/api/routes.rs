//! HTTP routes for orders and enrichment

use crate::api::error_response::{ApiError, REQUEST_ID_HEADER};
use crate::domain::{CreateOrderRequest, EnrichedOrder, EnrichmentRequest, Order, OrderId};
use crate::enrichment::{OrderEnrichmentService, OrderService, WorkflowError};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub enrichment: OrderEnrichmentService,
}

impl AppState {
    pub fn new(orders: OrderService, enrichment: OrderEnrichmentService) -> Self {
        Self { orders, enrichment }
    }
}

/// Build the service router
///
/// Layers, outer to inner: request ID assignment, request tracing, request
/// ID propagation onto the response.
pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/enrich", post(enrich_order))
        .route("/orders/{id}", get(get_order))
        .with_state(Arc::new(state))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

async fn health() -> &'static str {
    "OK"
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    state
        .orders
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &headers))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = Uuid::parse_str(&id).map(OrderId::new).map_err(|e| {
        ApiError::new(
            WorkflowError::validation(format!("Invalid order id: {e}")),
            &headers,
        )
    })?;

    state
        .orders
        .get(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &headers))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = body.map_err(|e| rejected(e, &headers))?;

    state
        .orders
        .create(request)
        .await
        .map(|order| (StatusCode::CREATED, Json(order)))
        .map_err(|e| ApiError::new(e, &headers))
}

async fn enrich_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<EnrichmentRequest>, JsonRejection>,
) -> Result<Json<EnrichedOrder>, ApiError> {
    let Json(request) = body.map_err(|e| rejected(e, &headers))?;

    state
        .enrichment
        .create_enriched(request)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &headers))
}

fn rejected(rejection: JsonRejection, headers: &HeaderMap) -> ApiError {
    ApiError::new(
        WorkflowError::validation(format!("Invalid request body: {}", rejection.body_text())),
        headers,
    )
}
