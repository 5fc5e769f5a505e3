use std::sync::Arc;

use axum::Router;
use clinic_auth::ActorResolver;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::auth::UserStoreResolver;
use crate::api::rest::routes;
use crate::config::CrmConfig;
use crate::domain::service::Service;
use crate::infra::providers::{voice_provider, whatsapp_provider};
use crate::infra::storage::migrations::Migrator;

/// Composition root of the CRM: wires storage, providers and the HTTP routes.
#[derive(Clone)]
pub struct CrmModule {
    service: Arc<Service>,
}

impl CrmModule {
    /// Build the service for an already migrated database.
    #[must_use]
    pub fn init(db: DatabaseConnection, cfg: CrmConfig) -> Self {
        info!("Initializing clinic_crm module");
        debug!(
            timeline_page_size = cfg.timeline_page_size,
            rate_limit = cfg.api_rate_limit_count,
            window_secs = cfg.api_rate_limit_window_secs,
            "Loaded crm config"
        );

        let whatsapp = whatsapp_provider(cfg.whatsapp_provider);
        let voice = voice_provider(cfg.voice_provider);
        let service = Arc::new(Service::new(db, Arc::new(cfg), whatsapp, voice));
        Self { service }
    }

    /// # Errors
    /// Fails when a migration cannot be applied.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running clinic_crm database migrations");
        Migrator::up(db, None).await?;
        info!("clinic_crm database migrations completed");
        Ok(())
    }

    #[must_use]
    pub fn service(&self) -> Arc<Service> {
        Arc::clone(&self.service)
    }

    /// Token resolver for the auth middleware backed by the `users` table.
    #[must_use]
    pub fn actor_resolver(&self) -> Arc<dyn ActorResolver> {
        Arc::new(UserStoreResolver::new(self.service()))
    }

    /// Mount the CRM routes on `router`.
    #[must_use]
    pub fn register_rest(&self, router: Router) -> Router {
        routes::register_routes(router, self.service())
    }
}
