use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};
use userdb_db::DbHandle;

use crate::api::rest::routes;
use crate::config::UsersInfoConfig;
use crate::contract::error::ServiceError;
use crate::domain::ports::ObjectStore;
use crate::domain::service::Service;
use crate::infra::objects::{LocalDirObjectStore, MemoryObjectStore};
use crate::infra::storage::{ensure_schema, SqlClientProvider};

/// The wired module: shared pool, picture store, service and routes.
pub struct UsersInfo {
    config: UsersInfoConfig,
    db: Arc<DbHandle>,
    service: Arc<Service>,
}

impl UsersInfo {
    /// Build the lazy pool and the service. No connection is opened unless
    /// schema creation is requested. Must run inside a tokio runtime.
    pub async fn init(config: UsersInfoConfig) -> Result<Self, ServiceError> {
        let db = config
            .db
            .open_handle()
            .map_err(|e| ServiceError::DB_OPEN.with_cause(e))?;
        info!(dsn = %db.dsn(), engine = ?db.engine(), "user database configured");

        if config.init_schema {
            ensure_schema(&db).await?;
            info!("user table ensured");
        }

        let objects: Arc<dyn ObjectStore> = match &config.bucket {
            Some(dir) => {
                info!(bucket = %dir, "profile pictures stored under bucket directory");
                Arc::new(LocalDirObjectStore::new(dir))
            }
            None => {
                warn!("no picture bucket configured, keeping pictures in memory");
                Arc::new(MemoryObjectStore::new())
            }
        };

        Ok(Self::with_parts(config, Arc::new(db), objects))
    }

    pub fn with_parts(
        config: UsersInfoConfig,
        db: Arc<DbHandle>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let provider = SqlClientProvider::new(db.clone(), config.db.host_url(), config.db.op_timeout);
        let service = Arc::new(Service::new(
            Arc::new(provider),
            objects,
            config.service_config(),
        ));
        Self {
            config,
            db,
            service,
        }
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn config(&self) -> &UsersInfoConfig {
        &self.config
    }

    pub fn router(&self) -> Result<Router, ServiceError> {
        routes::register_routes(
            Router::new(),
            self.service.clone(),
            self.config.functions.clone(),
        )
    }

    /// Close the shared pool; later requests fail with `DbClient`.
    pub async fn shutdown(&self) {
        self.db.close().await;
        info!("user database pool closed");
    }
}
