//! Module settings read from the resolved application parameters.

use std::time::Duration;

use runtime::AppConfig;
use userdb_db::{ConnectOpts, DbConnectOptions, DbError, DbHandle, MySqlTarget};

use crate::domain::service::{ServiceConfig, DEFAULT_STORAGE_TIMEOUT};
use crate::infra::storage::DEFAULT_OP_TIMEOUT;

pub const USERDB_HOST_ID: &str = "userdbHostId";
pub const USERDB_PORT_ID: &str = "userdbPortId";
pub const USERDB_DATABASE_ID: &str = "userdbDatabaseId";
pub const USERDB_LOGIN_ID: &str = "userdbLoginId";
pub const USERDB_CREDS_ID: &str = "userdbCredsId";
pub const USERDB_URL_ID: &str = "userdbUrlId";
pub const USERDB_MAX_POOL_CONNECTIONS_ID: &str = "userdbMaxPoolConnectionsId";
pub const USERDB_MAX_IDLE_CONNECTIONS_ID: &str = "userdbMaxIdleConnectionsId";
pub const USERDB_MAX_IDLE_TIME_ID: &str = "userdbMaxIdleTimeId";
pub const USERDB_MAX_LIFETIME_ID: &str = "userdbMaxLifeTimeId";
pub const USERDB_TIMEOUT_ID: &str = "userdbTimeoutId";
pub const USERDB_INIT_SCHEMA_ID: &str = "userdbInitSchemaId";
pub const USERDB_TEST_MODE_ID: &str = "userdbTestModeId";
pub const STORAGE_BUCKET_NAME_ID: &str = "storageBucketNameId";
pub const STORAGE_TIMEOUT_ID: &str = "storageTimeoutId";
pub const FUNCTION_HOST_ID: &str = "userdbFunctionHostId";
pub const FUNCTION_PORT_ID: &str = "userdbFunctionPortId";
pub const GET_USER_FUNCTION_ID: &str = "userdbGetUserId";
pub const ADD_USER_FUNCTION_ID: &str = "userdbAddUserId";
pub const DELETE_USER_FUNCTION_ID: &str = "userdbDeleteUserId";
pub const UPDATE_USER_FUNCTION_ID: &str = "userdbUpdateUserId";
pub const VALIDATE_USER_FUNCTION_ID: &str = "userdbValidateUserId";

/// Parameters whose values never appear in logs or dumps.
pub const SECRET_IDS: &[&str] = &[USERDB_CREDS_ID, USERDB_URL_ID];

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_MAX_IDLE: u32 = 2;
const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(300);
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Connection settings for the user database.
#[derive(Clone)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub login: String,
    pub password: String,
    /// Full DSN; wins over the individual fields when set.
    pub url: Option<String>,
    pub max_pool_connections: u32,
    /// Parsed and reported only; sqlx has no idle-count cap.
    pub max_idle_connections: u32,
    pub max_idle_time: Duration,
    pub max_lifetime: Duration,
    pub op_timeout: Duration,
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("login", &self.login)
            .field("password", &"***")
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("max_pool_connections", &self.max_pool_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("max_idle_time", &self.max_idle_time)
            .field("max_lifetime", &self.max_lifetime)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            database: "userdb".to_string(),
            login: "root".to_string(),
            password: String::new(),
            url: None,
            max_pool_connections: DEFAULT_POOL_SIZE,
            max_idle_connections: DEFAULT_MAX_IDLE,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl DbSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let d = Self::default();
        let pool = cfg.parsed_or::<i64>(USERDB_MAX_POOL_CONNECTIONS_ID, -1);

        Self {
            host: cfg.value_of_with_default(USERDB_HOST_ID, &d.host).to_string(),
            port: cfg.parsed_or(USERDB_PORT_ID, d.port),
            database: cfg
                .value_of_with_default(USERDB_DATABASE_ID, &d.database)
                .to_string(),
            login: cfg.value_of_with_default(USERDB_LOGIN_ID, &d.login).to_string(),
            password: cfg.value_of_with_default(USERDB_CREDS_ID, "").to_string(),
            url: cfg
                .assigned_value(USERDB_URL_ID)
                .then(|| cfg.value_of(USERDB_URL_ID).trim().to_string()),
            max_pool_connections: u32::try_from(pool)
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_POOL_SIZE),
            max_idle_connections: cfg.parsed_or(USERDB_MAX_IDLE_CONNECTIONS_ID, DEFAULT_MAX_IDLE),
            max_idle_time: secs(cfg, USERDB_MAX_IDLE_TIME_ID, DEFAULT_MAX_IDLE_TIME),
            max_lifetime: Duration::from_secs(
                60 * cfg.parsed_or(USERDB_MAX_LIFETIME_ID, DEFAULT_MAX_LIFETIME.as_secs() / 60),
            ),
            op_timeout: secs(cfg, USERDB_TIMEOUT_ID, DEFAULT_OP_TIMEOUT),
        }
    }

    pub fn connect_opts(&self) -> ConnectOpts {
        ConnectOpts {
            max_conns: Some(self.max_pool_connections),
            min_conns: None,
            acquire_timeout: Some(self.op_timeout),
            idle_timeout: Some(self.max_idle_time),
            max_lifetime: Some(self.max_lifetime),
            test_before_acquire: true,
            create_sqlite_dirs: true,
        }
    }

    /// Where the database lives, `host:port` or the redacted DSN.
    pub fn host_url(&self) -> String {
        match &self.url {
            Some(url) => userdb_db::redact_credentials_in_dsn(Some(url)),
            None => format!("{}:{}", self.host, self.port),
        }
    }

    /// Lazy pool over these settings; no connection is opened yet.
    /// Must run inside a tokio runtime.
    pub fn open_handle(&self) -> Result<DbHandle, DbError> {
        let opts = self.connect_opts();
        match &self.url {
            Some(url) => DbHandle::connect_lazy(url, opts),
            None => {
                let target = MySqlTarget {
                    host: self.host.clone(),
                    port: self.port,
                    database: self.database.clone(),
                    user: self.login.clone(),
                    password: self.password.clone(),
                };
                DbHandle::connect_lazy_with(target.to_options()?, &opts)
            }
        }
    }

    /// Typed options without building a pool, for dry runs.
    pub fn connect_options(&self) -> Result<DbConnectOptions, DbError> {
        match &self.url {
            Some(url) => DbConnectOptions::from_dsn(url, &self.connect_opts()),
            None => MySqlTarget {
                host: self.host.clone(),
                port: self.port,
                database: self.database.clone(),
                user: self.login.clone(),
                password: self.password.clone(),
            }
            .to_options(),
        }
    }
}

fn secs(cfg: &AppConfig, id: &str, default: Duration) -> Duration {
    Duration::from_secs(cfg.parsed_or(id, default.as_secs()))
}

/// Function names each handler answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNames {
    pub get_user: String,
    pub add_user: String,
    pub delete_user: String,
    pub update_user: String,
    pub validate_user: String,
}

impl Default for FunctionNames {
    fn default() -> Self {
        Self {
            get_user: "GetUser".to_string(),
            add_user: "AddUser".to_string(),
            delete_user: "DeleteUser".to_string(),
            update_user: "UpdateUser".to_string(),
            validate_user: "ValidateUser".to_string(),
        }
    }
}

impl FunctionNames {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let d = Self::default();
        let name = |id: &str, default: &str| cfg.value_of_with_default(id, default).trim().to_string();
        Self {
            get_user: name(GET_USER_FUNCTION_ID, &d.get_user),
            add_user: name(ADD_USER_FUNCTION_ID, &d.add_user),
            delete_user: name(DELETE_USER_FUNCTION_ID, &d.delete_user),
            update_user: name(UPDATE_USER_FUNCTION_ID, &d.update_user),
            validate_user: name(VALIDATE_USER_FUNCTION_ID, &d.validate_user),
        }
    }

    pub fn all(&self) -> [&str; 5] {
        [
            &self.get_user,
            &self.add_user,
            &self.delete_user,
            &self.update_user,
            &self.validate_user,
        ]
    }

    /// Names must be non-empty, distinct and usable as a path segment.
    pub fn validate(&self) -> Result<(), String> {
        let all = self.all();
        for (i, name) in all.iter().enumerate() {
            if name.is_empty() || name.contains(['/', '{', '}', '*', ' ']) {
                return Err(format!("invalid function name '{name}'"));
            }
            if all[..i].contains(name) {
                return Err(format!("function name '{name}' is used twice"));
            }
        }
        Ok(())
    }
}

/// Everything the module reads from the application parameters.
#[derive(Debug, Clone)]
pub struct UsersInfoConfig {
    pub db: DbSettings,
    pub functions: FunctionNames,
    /// Directory backing the picture bucket; in-memory when unset.
    pub bucket: Option<String>,
    pub storage_timeout: Duration,
    pub init_schema: bool,
    pub test_mode: bool,
    pub bind_host: String,
    pub bind_port: u16,
}

impl Default for UsersInfoConfig {
    fn default() -> Self {
        Self {
            db: DbSettings::default(),
            functions: FunctionNames::default(),
            bucket: None,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            init_schema: false,
            test_mode: false,
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8088,
        }
    }
}

impl UsersInfoConfig {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let d = Self::default();
        Self {
            db: DbSettings::from_config(cfg),
            functions: FunctionNames::from_config(cfg),
            bucket: cfg
                .assigned_value(STORAGE_BUCKET_NAME_ID)
                .then(|| cfg.value_of(STORAGE_BUCKET_NAME_ID).trim().to_string()),
            storage_timeout: secs(cfg, STORAGE_TIMEOUT_ID, d.storage_timeout),
            init_schema: cfg.flag(USERDB_INIT_SCHEMA_ID),
            test_mode: cfg.flag(USERDB_TEST_MODE_ID),
            bind_host: cfg.value_of_with_default(FUNCTION_HOST_ID, &d.bind_host).to_string(),
            bind_port: cfg.parsed_or(FUNCTION_PORT_ID, d.bind_port),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            storage_timeout: self.storage_timeout,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{ConfigSources, ParserConfig};

    fn resolve(params: &[(&str, &str)]) -> AppConfig {
        let descriptor = serde_json::json!({
            "parameters": params
                .iter()
                .map(|(id, default)| serde_json::json!({ "optionId": id, "defaultVal": default }))
                .collect::<Vec<_>>()
        });
        let parser = ParserConfig::from_json_str(&descriptor.to_string()).unwrap();
        AppConfig::resolve_with(&parser, &ConfigSources::default())
    }

    #[test]
    fn defaults_when_nothing_is_assigned() {
        let cfg = UsersInfoConfig::from_config(&resolve(&[]));
        assert_eq!(cfg.db.host, "127.0.0.1");
        assert_eq!(cfg.db.port, 3306);
        assert_eq!(cfg.db.max_pool_connections, 10);
        assert_eq!(cfg.db.max_idle_connections, 2);
        assert_eq!(cfg.db.max_idle_time, Duration::from_secs(300));
        assert_eq!(cfg.db.max_lifetime, Duration::from_secs(1800));
        assert_eq!(cfg.db.op_timeout, Duration::from_secs(10));
        assert_eq!(cfg.functions, FunctionNames::default());
        assert!(cfg.bucket.is_none());
        assert!(!cfg.test_mode);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8088");
    }

    #[test]
    fn pool_size_falls_back_on_nonsense() {
        for raw in ["-1", "0", "lots"] {
            let cfg = resolve(&[(USERDB_MAX_POOL_CONNECTIONS_ID, raw)]);
            assert_eq!(DbSettings::from_config(&cfg).max_pool_connections, 10, "{raw}");
        }
        let cfg = resolve(&[(USERDB_MAX_POOL_CONNECTIONS_ID, "25")]);
        assert_eq!(DbSettings::from_config(&cfg).max_pool_connections, 25);
    }

    #[test]
    fn unset_marker_keeps_defaults() {
        let cfg = resolve(&[
            (USERDB_HOST_ID, runtime::UNSET),
            (USERDB_CREDS_ID, runtime::UNSET),
            (USERDB_URL_ID, runtime::UNSET),
        ]);
        let db = DbSettings::from_config(&cfg);
        assert_eq!(db.host, "127.0.0.1");
        assert!(db.password.is_empty());
        assert!(db.url.is_none());
    }

    #[test]
    fn assigned_values_are_used() {
        let cfg = resolve(&[
            (USERDB_HOST_ID, "db.internal"),
            (USERDB_PORT_ID, "3307"),
            (USERDB_CREDS_ID, "pw"),
            (USERDB_MAX_LIFETIME_ID, "5"),
            (STORAGE_BUCKET_NAME_ID, "/var/pictures"),
            (USERDB_TEST_MODE_ID, "true"),
            (GET_USER_FUNCTION_ID, "FetchUser"),
        ]);
        let m = UsersInfoConfig::from_config(&cfg);
        assert_eq!(m.db.host_url(), "db.internal:3307");
        assert_eq!(m.db.max_lifetime, Duration::from_secs(300));
        assert_eq!(m.bucket.as_deref(), Some("/var/pictures"));
        assert!(m.test_mode);
        assert_eq!(m.functions.get_user, "FetchUser");
        assert!(!format!("{:?}", m.db).contains("pw\""));
    }

    #[test]
    fn url_overrides_host_fields() {
        let cfg = resolve(&[(USERDB_URL_ID, "mysql://svc:hunter2@db:3306/users")]);
        let db = DbSettings::from_config(&cfg);
        assert_eq!(db.host_url(), "mysql://svc:***@db:3306/users");
        assert!(db.connect_options().unwrap().to_string().contains("db:3306"));
    }

    #[test]
    fn function_names_must_be_distinct() {
        let mut names = FunctionNames::default();
        assert!(names.validate().is_ok());
        names.update_user = "GetUser".into();
        assert!(names.validate().is_err());
        names.update_user = "Update/User".into();
        assert!(names.validate().is_err());
    }
}
