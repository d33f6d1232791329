//! SQL-backed [`UserDbClient`] over a `userdb-db` handle.

pub mod errors;
mod ops;
pub mod sql;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, instrument};
use userdb_db::{DbEngine, DbError, DbHandle};

use crate::config::DbSettings;
use crate::contract::client::{DbClientProvider, UserDbClient};
use crate::contract::error::ServiceError;
use crate::contract::model::User;
use crate::domain::timestamp::Timestamp;

pub use ops::StoredRow;

/// Default bound on one data access operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// User table client. Either owns its pool and closes it on [`close`],
/// or shares one with other clients and only marks itself closed.
///
/// [`close`]: UserDbClient::close
pub struct SqlUserDbClient {
    db: Arc<DbHandle>,
    owns_pool: bool,
    host_url: String,
    op_timeout: Duration,
    closed: AtomicBool,
}

impl SqlUserDbClient {
    /// Client that owns `db`.
    pub fn owned(db: DbHandle, host_url: impl Into<String>, op_timeout: Duration) -> Self {
        Self::build(Arc::new(db), true, host_url.into(), op_timeout)
    }

    /// Client over a pool shared with other clients.
    pub fn shared(db: Arc<DbHandle>, host_url: impl Into<String>, op_timeout: Duration) -> Self {
        Self::build(db, false, host_url.into(), op_timeout)
    }

    /// Standalone client with its own lazy pool. Must run inside a tokio runtime.
    pub fn open(settings: &DbSettings) -> Result<Self, ServiceError> {
        let db = settings.open_handle().map_err(|e| match e {
            DbError::UnknownDsn(_) | DbError::InvalidParameter(_) | DbError::FeatureDisabled(_) => {
                ServiceError::DB_CLIENT.with_cause(e)
            }
            other => ServiceError::DB_OPEN.with_cause(other),
        })?;
        debug!(host = %settings.host_url(), "opened user db client");
        Ok(Self::owned(db, settings.host_url(), settings.op_timeout))
    }

    fn build(db: Arc<DbHandle>, owns_pool: bool, host_url: String, op_timeout: Duration) -> Self {
        Self {
            db,
            owns_pool,
            host_url,
            op_timeout,
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), ServiceError> {
        if self.closed.load(Ordering::Acquire) || self.db.is_closed() {
            return Err(ServiceError::DB_CLIENT.with_cause("client is closed"));
        }
        Ok(())
    }

    fn mysql(&self) -> Result<&sqlx::MySqlPool, ServiceError> {
        self.db
            .sqlx_mysql()
            .ok_or_else(|| ServiceError::DB_CLIENT.with_cause("handle has no MySQL pool"))
    }

    fn sqlite(&self) -> Result<&sqlx::SqlitePool, ServiceError> {
        self.db
            .sqlx_sqlite()
            .ok_or_else(|| ServiceError::DB_CLIENT.with_cause("handle has no SQLite pool"))
    }

    /// Run `op`, failing with `on_timeout` once the operation deadline passes.
    async fn bounded<T, F>(&self, on_timeout: ServiceError, op: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(res) => res,
            Err(elapsed) => Err(on_timeout.with_cause(elapsed)),
        }
    }
}

fn stamp(raw: &str) -> Result<Option<NaiveDateTime>, ServiceError> {
    if raw.is_empty() {
        return Ok(None);
    }
    Timestamp::parse(raw)
        .map(|t| Some(t.as_naive()))
        .map_err(|e| ServiceError::DATETIME.with_cause(e))
}

#[async_trait]
impl UserDbClient for SqlUserDbClient {
    #[instrument(name = "users_info.db.fetch", skip_all, fields(user_id = %user.user_id))]
    async fn fetch_info(&self, user: &mut User) -> Result<bool, ServiceError> {
        user.validate_key()?;
        self.check_open()?;

        let row = self
            .bounded(ServiceError::DB_QUERY, async {
                match self.db.engine() {
                    DbEngine::MySql => ops::mysql::fetch(self.mysql()?, user).await,
                    DbEngine::Sqlite => ops::sqlite::fetch(self.sqlite()?, user).await,
                }
            })
            .await?;

        match row {
            Some(row) => {
                row.apply_to(user);
                Ok(true)
            }
            None => {
                debug!("no stored row");
                Ok(false)
            }
        }
    }

    #[instrument(name = "users_info.db.add", skip_all, fields(user_id = %user.user_id))]
    async fn add(&self, user: &User) -> Result<(), ServiceError> {
        user.validate_key()?;
        self.check_open()?;

        self.bounded(ServiceError::DB_INSERT, async {
            match self.db.engine() {
                DbEngine::MySql => ops::mysql::insert(self.mysql()?, user).await,
                DbEngine::Sqlite => ops::sqlite::insert(self.sqlite()?, user).await,
            }
        })
        .await
    }

    #[instrument(name = "users_info.db.delete", skip_all, fields(user_id = %user.user_id))]
    async fn delete(&self, user: &User) -> Result<(), ServiceError> {
        user.validate_key()?;
        self.check_open()?;

        self.bounded(ServiceError::DB_EXECUTE, async {
            match self.db.engine() {
                DbEngine::MySql => ops::mysql::delete(self.mysql()?, user).await,
                DbEngine::Sqlite => ops::sqlite::delete(self.sqlite()?, user).await,
            }
        })
        .await
    }

    #[instrument(name = "users_info.db.update", skip_all, fields(user_id = %user.user_id))]
    async fn update(&self, user: &User) -> Result<(), ServiceError> {
        user.validate_key()?;
        self.check_open()?;
        let last_login = stamp(&user.last_login)?;
        let validated = stamp(&user.validated)?;

        self.bounded(ServiceError::DB_EXECUTE, async {
            match self.db.engine() {
                DbEngine::MySql => {
                    ops::mysql::update(self.mysql()?, user, last_login, validated).await
                }
                DbEngine::Sqlite => {
                    ops::sqlite::update(self.sqlite()?, user, last_login, validated).await
                }
            }
        })
        .await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) && self.owns_pool {
            self.db.close().await;
            debug!(host = %self.host_url, "user db client closed");
        }
    }

    fn host_url(&self) -> &str {
        &self.host_url
    }
}

/// Create the `user` table when missing.
pub async fn ensure_schema(db: &DbHandle) -> Result<(), ServiceError> {
    match db.engine() {
        DbEngine::MySql => {
            let pool = db
                .sqlx_mysql()
                .ok_or_else(|| ServiceError::DB_CLIENT.with_cause("handle has no MySQL pool"))?;
            ops::mysql::create_schema(pool).await
        }
        DbEngine::Sqlite => {
            let pool = db
                .sqlx_sqlite()
                .ok_or_else(|| ServiceError::DB_CLIENT.with_cause("handle has no SQLite pool"))?;
            ops::sqlite::create_schema(pool).await
        }
    }
}

/// Hands out clients over one shared pool.
#[derive(Clone)]
pub struct SqlClientProvider {
    db: Arc<DbHandle>,
    host_url: String,
    op_timeout: Duration,
}

impl SqlClientProvider {
    pub fn new(db: Arc<DbHandle>, host_url: impl Into<String>, op_timeout: Duration) -> Self {
        Self {
            db,
            host_url: host_url.into(),
            op_timeout,
        }
    }

    pub fn handle(&self) -> &Arc<DbHandle> {
        &self.db
    }
}

#[async_trait]
impl DbClientProvider for SqlClientProvider {
    async fn client(&self) -> Result<Box<dyn UserDbClient>, ServiceError> {
        if self.db.is_closed() {
            return Err(ServiceError::DB_CLIENT.with_cause("connection pool is closed"));
        }
        Ok(Box::new(SqlUserDbClient::shared(
            self.db.clone(),
            self.host_url.clone(),
            self.op_timeout,
        )))
    }
}
