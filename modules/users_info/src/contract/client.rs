use async_trait::async_trait;

use crate::contract::error::ServiceError;
use crate::contract::model::User;

/// Data access for user records keyed by (user id, profile, email).
///
/// Every operation validates the key before touching the database and
/// fails with [`ServiceError::InvalidKey`] without I/O when it is incomplete.
#[async_trait]
pub trait UserDbClient: Send + Sync {
    /// Fill password, picture, token and timestamps from the stored row.
    /// Returns `false` and leaves `user` untouched when no row matches.
    async fn fetch_info(&self, user: &mut User) -> Result<bool, ServiceError>;

    async fn add(&self, user: &User) -> Result<(), ServiceError>;

    /// Deleting a missing row is not an error.
    async fn delete(&self, user: &User) -> Result<(), ServiceError>;

    /// Rewrite password, picture and token, then any non-empty timestamps.
    async fn update(&self, user: &User) -> Result<(), ServiceError>;

    /// Release the client. Further operations fail with `DbClient`.
    async fn close(&self);

    /// `host:port` of the database this client talks to.
    fn host_url(&self) -> &str;
}

/// Hands out one client per request.
#[async_trait]
pub trait DbClientProvider: Send + Sync {
    async fn client(&self) -> Result<Box<dyn UserDbClient>, ServiceError>;
}
