//! Typed connection options.

use std::fmt;

use crate::{ConnectOpts, DbError, DbHandle, Result};

/// Connect options for the supported engines.
#[derive(Clone)]
pub enum DbConnectOptions {
    #[cfg(feature = "mysql")]
    MySql(sqlx::mysql::MySqlConnectOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::sqlite::SqliteConnectOptions),
}

impl fmt::Display for DbConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "mysql")]
            DbConnectOptions::MySql(o) => {
                write!(f, "mysql://{}:***@{}:{}", o.get_username(), o.get_host(), o.get_port())?;
                if let Some(db) = o.get_database() {
                    write!(f, "/{db}")?;
                }
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            DbConnectOptions::Sqlite(o) => {
                write!(f, "sqlite://{}", o.get_filename().to_string_lossy())
            }
        }
    }
}

impl fmt::Debug for DbConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DbConnectOptions({self})")
    }
}

impl DbConnectOptions {
    /// Parse a DSN into typed options for the engine its scheme names.
    pub fn from_dsn(dsn: &str, opts: &ConnectOpts) -> Result<Self> {
        let engine = DbHandle::detect(dsn)?;
        match engine {
            #[cfg(feature = "mysql")]
            crate::DbEngine::MySql => {
                let normalized = match dsn.trim_start().strip_prefix("mariadb://") {
                    Some(rest) => format!("mysql://{rest}"),
                    None => dsn.trim_start().to_string(),
                };
                let o = normalized
                    .parse::<sqlx::mysql::MySqlConnectOptions>()
                    .map_err(|e| DbError::InvalidParameter(e.to_string()))?;
                Ok(DbConnectOptions::MySql(o))
            }
            #[cfg(feature = "sqlite")]
            crate::DbEngine::Sqlite => Ok(DbConnectOptions::Sqlite(crate::sqlite_options(
                dsn.trim_start(),
                opts.create_sqlite_dirs,
            )?)),
            #[cfg(not(feature = "mysql"))]
            crate::DbEngine::MySql => Err(DbError::FeatureDisabled("MySQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            crate::DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }
}

/// MySQL server coordinates assembled from individual settings.
#[derive(Clone, Default)]
pub struct MySqlTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for MySqlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl MySqlTarget {
    /// Build typed MySQL options. Host and database are required.
    pub fn to_options(&self) -> Result<DbConnectOptions> {
        if self.host.trim().is_empty() {
            return Err(DbError::InvalidParameter(
                "host is required for MySQL connections".to_string(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(DbError::InvalidParameter(
                "database is required for MySQL connections".to_string(),
            ));
        }

        #[cfg(feature = "mysql")]
        {
            let mut o = sqlx::mysql::MySqlConnectOptions::new()
                .host(self.host.trim())
                .port(self.port)
                .database(self.database.trim());
            if !self.user.is_empty() {
                o = o.username(&self.user);
            }
            if !self.password.is_empty() {
                o = o.password(&self.password);
            }
            Ok(DbConnectOptions::MySql(o))
        }
        #[cfg(not(feature = "mysql"))]
        {
            Err(DbError::FeatureDisabled("MySQL feature not enabled"))
        }
    }
}

/// Redact credentials from DSN for logging.
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => {
            if let Ok(mut parsed) = url::Url::parse(dsn) {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            } else {
                "***".to_string()
            }
        }
        Some(dsn) => dsn.to_string(),
        None => "none".to_string(),
    }
}
