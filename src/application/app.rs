use crate::api::{router, AppState};
use crate::config::{Settings, StorageBackend};
use crate::enrichment::{OrderEnrichmentService, OrderService};
use crate::infrastructure::{
    HttpPriceClient, InMemoryOrderRepository, OrderRepository, PgOrderRepository, PriceSource,
};
use crate::Result;
use axum::Router;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    router: Router,
}

impl Application {
    /// Build storage and the price client from `settings`
    #[instrument(skip(settings), fields(backend = ?settings.database.backend))]
    pub async fn new(settings: Settings) -> Result<Self> {
        let repository: Arc<dyn OrderRepository> = match settings.database.backend {
            StorageBackend::Memory => {
                info!("Using in-memory order storage");
                Arc::new(InMemoryOrderRepository::new())
            }
            StorageBackend::Postgres => {
                info!("Connecting to database at {}", settings.database.host);
                let repository = PgOrderRepository::connect(
                    &settings.database_url(),
                    settings.database.max_connections,
                )
                .await?;
                repository.health_check().await?;
                Arc::new(repository)
            }
        };

        let prices: Arc<dyn PriceSource> =
            Arc::new(HttpPriceClient::from_settings(&settings.price_service));

        Ok(Self::from_parts(settings, repository, prices))
    }

    /// Assemble the application around already-built collaborators
    pub fn from_parts(
        settings: Settings,
        repository: Arc<dyn OrderRepository>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        let enrichment = OrderEnrichmentService::new(Arc::clone(&repository), prices)
            .with_scope_deadline(settings.enrichment.scope_deadline());
        let orders = OrderService::new(repository);
        let router = router(AppState::new(orders, enrichment));

        Self { settings, router }
    }

    /// Serve HTTP until Ctrl-C
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let address = self.settings.listen_address();
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!("Starting Order Scope server on {}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_requested())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn shutdown_requested() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for Ctrl-C, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let settings = Settings::defaults().unwrap();
        let app = Application::new(settings).await.unwrap();
        assert_eq!(app.settings().database.backend, StorageBackend::Memory);
    }

    #[tokio::test]
    #[ignore = "requires database connection"]
    async fn test_application_can_be_created_with_postgres() {
        let mut settings = Settings::defaults().unwrap();
        settings.database.backend = StorageBackend::Postgres;
        let app = Application::new(settings)
            .await
            .expect("Failed to create application");
        assert!(app.settings().application.port > 0);
    }
}
