#![cfg_attr(
    not(any(feature = "mysql", feature = "sqlite")),
    allow(unused_imports, unused_variables, dead_code, unreachable_code)
)]

//! Database handle for the user store.
//!
//! Wraps one sqlx pool (MySQL in deployments, SQLite for local runs and
//! tests) behind a small handle that knows its engine, can be built lazily
//! so construction never touches the network, and can be closed
//! explicitly.
//!
//! # Features
//! - `mysql`, `sqlite`: enable SQLx backends
//! - `integration`: container-backed tests
//!
//! # Example
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> userdb_db::Result<()> {
//!     use userdb_db::{ConnectOpts, DbHandle};
//!
//!     let db = DbHandle::connect_lazy("mysql://root:pw@127.0.0.1:3306/users", ConnectOpts::default())?;
//!     // Use db.sqlx_mysql() ...
//!     db.close().await;
//!     Ok(())
//! }
//! ```

pub mod options;
mod pool_opts;

pub use options::{redact_credentials_in_dsn, DbConnectOptions, MySqlTarget};

use std::time::Duration;

#[cfg(feature = "mysql")]
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
#[cfg(feature = "sqlite")]
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use pool_opts::ApplyPoolOpts;
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid connection parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    MySql,
    Sqlite,
}

/// Pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
            create_sqlite_dirs: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
}

const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl DbHandle {
    /// Detect engine by DSN scheme prefix.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();

        if s.starts_with("mysql://") || s.starts_with("mariadb://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn))))
        }
    }

    /// Connect eagerly: the first connection is opened before returning.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let options = DbConnectOptions::from_dsn(dsn, &opts)?;
        let handle = Self::connect_lazy_with(options, &opts)?;
        match &handle.pool {
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => drop(p.acquire().await?),
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => drop(p.acquire().await?),
        }
        Ok(handle)
    }

    /// Build the pool without opening any connection.
    pub fn connect_lazy(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let options = DbConnectOptions::from_dsn(dsn, &opts)?;
        Self::connect_lazy_with(options, &opts)
    }

    /// Build the pool from typed options without opening any connection.
    pub fn connect_lazy_with(options: DbConnectOptions, opts: &ConnectOpts) -> Result<Self> {
        let dsn = options.to_string();
        match options {
            #[cfg(feature = "mysql")]
            DbConnectOptions::MySql(o) => {
                let pool = MySqlPoolOptions::new().apply(opts).connect_lazy_with(o);
                tracing::debug!(dsn = %dsn, "mysql pool created");
                Ok(Self {
                    engine: DbEngine::MySql,
                    pool: DbPool::MySql(pool),
                    dsn,
                })
            }
            #[cfg(feature = "sqlite")]
            DbConnectOptions::Sqlite(o) => {
                let pool = SqlitePoolOptions::new().apply(opts).connect_lazy_with(o);
                tracing::debug!(dsn = %dsn, "sqlite pool created");
                Ok(Self {
                    engine: DbEngine::Sqlite,
                    pool: DbPool::Sqlite(pool),
                    dsn,
                })
            }
        }
    }

    /// Close the pool and wait for checked-out connections to return.
    /// Safe to call more than once.
    pub async fn close(&self) {
        match &self.pool {
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.pool {
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.is_closed(),
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.is_closed(),
        }
    }

    /// Get the backend.
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN this handle was built from, with the password masked.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    // --- sqlx accessors ---
    #[cfg(feature = "mysql")]
    pub fn sqlx_mysql(&self) -> Option<&MySqlPool> {
        match self.pool {
            DbPool::MySql(ref p) => Some(p),
            #[cfg(feature = "sqlite")]
            _ => None,
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(feature = "mysql")]
            _ => None,
        }
    }
}

// ===================== helpers =====================

#[cfg(feature = "sqlite")]
pub(crate) fn sqlite_options(dsn: &str, create_dirs: bool) -> Result<SqliteConnectOptions> {
    use std::str::FromStr;

    prepare_sqlite_path(dsn, create_dirs)?;
    let opts = SqliteConnectOptions::from_str(dsn)?
        .create_if_missing(true)
        .busy_timeout(DEFAULT_SQLITE_BUSY_TIMEOUT);
    Ok(opts)
}

#[cfg(feature = "sqlite")]
fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> Result<()> {
    if !create_dirs || dsn.contains(":memory:") {
        return Ok(());
    }

    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);

    if !raw.starts_with("file:") && !raw.contains('?') {
        if let Some(parent) = std::path::Path::new(raw).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
