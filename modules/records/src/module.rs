use std::sync::Arc;

use axum::Router;
use bio_db::UnitOfWork;
use tracing::{info, warn};

use crate::api::rest::auth::AuthConfig;
use crate::api::rest::routes;
use crate::config::RecordsConfig;
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage::sea_orm_repo::{
    SeaOrmApplicationsRepository, SeaOrmCatalogRepository, SeaOrmUsersRepository,
};

/// The records module: SeaORM repositories behind the domain service, exposed
/// over REST.
#[derive(Clone)]
pub struct Records {
    service: Arc<Service>,
    auth: AuthConfig,
}

impl Records {
    pub fn new(uow: UnitOfWork, cfg: &RecordsConfig) -> Self {
        info!(
            transactional = uow.is_transactional(),
            "Initializing records module"
        );
        if cfg.jwt_secret.is_empty() {
            warn!("records.jwt_secret is empty; session authentication is disabled");
        }

        let service = Service::new(
            uow,
            Arc::new(SeaOrmApplicationsRepository),
            Arc::new(SeaOrmUsersRepository),
            Arc::new(SeaOrmCatalogRepository),
            ServiceConfig::from(cfg),
        );
        Self {
            service: Arc::new(service),
            auth: AuthConfig::from(cfg),
        }
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn router(&self) -> Router {
        routes::router(self.service.clone(), self.auth.clone())
    }
}
