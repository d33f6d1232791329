use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::contract::client::{DbClientProvider, UserDbClient};
use crate::contract::error::ServiceError;
use crate::contract::model::{User, PIC_KEY_TAG};
use crate::domain::picture;
use crate::domain::ports::{ObjectStore, ObjectStoreError};
use crate::domain::timestamp::Timestamp;
use crate::domain::validation::{validation_state, ValidationState};

/// Default bound on a single object store call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub storage_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Confirmed by this call; carries the stored record.
    Now(User),
    /// Had been confirmed before.
    Already(User),
}

impl Validated {
    pub fn user(&self) -> &User {
        match self {
            Validated::Now(u) | Validated::Already(u) => u,
        }
    }
}

/// User account operations. Every call borrows its own database client and
/// closes it before returning.
#[derive(Clone)]
pub struct Service {
    clients: Arc<dyn DbClientProvider>,
    objects: Arc<dyn ObjectStore>,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        clients: Arc<dyn DbClientProvider>,
        objects: Arc<dyn ObjectStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            clients,
            objects,
            config,
        }
    }

    /// Stored record for the key in `user`.
    #[instrument(name = "users_info.service.get_user", skip(self, user), fields(user_id = %user.user_id, profile = %user.profile))]
    pub async fn get_user(&self, mut user: User) -> Result<User, ServiceError> {
        user.validate_key()?;
        let client = self.clients.client().await?;
        let found = client.fetch_info(&mut user).await;
        client.close().await;

        if found? {
            debug!("user found");
            Ok(user)
        } else {
            Err(ServiceError::DB_PKEY_MISSING.with_cause(format!(
                "no user {}/{}/{}",
                user.user_id, user.profile, user.email
            )))
        }
    }

    /// Create an account. Hashes a plaintext password, moves an inline
    /// picture to the object store and stamps the creation time. The row is
    /// inserted before anything is written to the store.
    #[instrument(name = "users_info.service.add_user", skip(self, user), fields(user_id = %user.user_id, profile = %user.profile))]
    pub async fn add_user(&self, mut user: User) -> Result<User, ServiceError> {
        user.validate_key()?;
        check_picture_key(&user)?;
        if user.has_text_pwd() {
            user.password = user.pwd_hash(true);
        }
        let staged = stage_picture(&mut user)?;

        let client = self.clients.client().await?;
        let res = async {
            client.add(&user).await?;
            if let Some((key, data)) = staged {
                if let Err(e) = self.storage_call(self.objects.put(&key, data)).await {
                    if let Err(undo) = client.delete(&user).await {
                        warn!(error = %undo, "failed to roll back user row");
                    }
                    return Err(e);
                }
                debug!(%key, "profile picture stored");
                user.picture = format!("{PIC_KEY_TAG}{key}");
            }
            user.last_login = Timestamp::now().to_string();
            client.update(&user).await
        }
        .await;
        client.close().await;
        res?;

        info!("user added");
        user.image_type.clear();
        Ok(user)
    }

    /// Remove an account and its stored picture. Missing accounts are fine.
    #[instrument(name = "users_info.service.delete_user", skip(self, user), fields(user_id = %user.user_id, profile = %user.profile))]
    pub async fn delete_user(&self, user: User) -> Result<User, ServiceError> {
        user.validate_key()?;
        let client = self.clients.client().await?;
        let res = self.remove_user_data(client.as_ref(), &user).await;
        client.close().await;
        res?;

        info!("user deleted");
        Ok(user)
    }

    #[instrument(name = "users_info.service.update_user", skip(self, user), fields(user_id = %user.user_id, profile = %user.profile))]
    pub async fn update_user(&self, mut user: User) -> Result<User, ServiceError> {
        user.validate_key()?;
        check_picture_key(&user)?;
        if !user.password.is_empty() && user.has_text_pwd() {
            user.password = user.pwd_hash(true);
        }

        let client = self.clients.client().await?;
        let res = client.update(&user).await;
        client.close().await;
        res?;

        info!("user updated");
        Ok(user)
    }

    /// Confirm an account against the current time.
    pub async fn validate_user(&self, user: User) -> Result<Validated, ServiceError> {
        self.validate_user_at(user, Timestamp::now()).await
    }

    /// Confirm an account as of `now`. Inside the window the account is
    /// stamped validated; past it the account and its picture are removed
    /// and the call fails with `UserValidation`.
    #[instrument(name = "users_info.service.validate_user", skip(self, user, now), fields(user_id = %user.user_id, profile = %user.profile, now = %now))]
    pub async fn validate_user_at(
        &self,
        mut user: User,
        now: Timestamp,
    ) -> Result<Validated, ServiceError> {
        user.validate_key()?;
        let client = self.clients.client().await?;
        let res = self.confirm(client.as_ref(), &mut user, &now).await;
        client.close().await;
        res
    }

    /// Base64 image bytes behind a tagged or bare object key.
    #[instrument(name = "users_info.service.encoded_image", skip(self))]
    pub async fn encoded_image(&self, picture_ref: &str) -> Result<String, ServiceError> {
        let key = picture_ref.strip_prefix(PIC_KEY_TAG).unwrap_or(picture_ref);
        let data = self.storage_call(self.objects.get(key)).await?;
        Ok(picture::encode(&data))
    }

    async fn confirm(
        &self,
        client: &dyn UserDbClient,
        user: &mut User,
        now: &Timestamp,
    ) -> Result<Validated, ServiceError> {
        if !client.fetch_info(user).await? {
            return Err(ServiceError::DB_PKEY_MISSING.with_cause(format!(
                "no user {}/{}/{}",
                user.user_id, user.profile, user.email
            )));
        }

        match validation_state(user, now) {
            ValidationState::Validated => {
                debug!(validated = %user.validated, "user already validated");
                Ok(Validated::Already(user.clone()))
            }
            ValidationState::Fresh => {
                user.validated = now.to_string();
                client.update(user).await?;
                info!("user validated");
                Ok(Validated::Now(user.clone()))
            }
            ValidationState::Expired => {
                warn!(last_login = %user.last_login, "validation window expired, removing user");
                if let Err(e) = self.remove_user_data(client, user).await {
                    warn!(error = %e, "failed to remove expired user");
                }
                Err(ServiceError::USER_VALIDATION.with_cause(format!(
                    "user {}/{} was created at '{}'",
                    user.user_id, user.profile, user.last_login
                )))
            }
        }
    }

    async fn remove_user_data(
        &self,
        client: &dyn UserDbClient,
        user: &User,
    ) -> Result<(), ServiceError> {
        let mut stored = user.key_only();
        client.fetch_info(&mut stored).await?;

        match stored.profile_pic_key() {
            Some(key) if picture::is_owned_key(&user.user_id, &user.profile, key) => {
                if let Err(e) = self.storage_call(self.objects.delete(key)).await {
                    warn!(key, error = %e, "failed to delete profile picture");
                }
            }
            Some(key) => warn!(key, "stored picture key belongs to another user, leaving it"),
            None => {}
        }

        client.delete(user).await
    }

    async fn storage_call<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ObjectStoreError>>,
    {
        match tokio::time::timeout(self.config.storage_timeout, call).await {
            Ok(res) => res.map_err(|e| ServiceError::CLOUD_STORAGE.with_cause(e)),
            Err(elapsed) => Err(ServiceError::CLOUD_STORAGE.with_cause(elapsed)),
        }
    }
}

/// A tagged picture must name this user's own object key.
fn check_picture_key(user: &User) -> Result<(), ServiceError> {
    match user.profile_pic_key() {
        Some(key) if !picture::is_owned_key(&user.user_id, &user.profile, key) => Err(
            ServiceError::INVALID_MSG.with_cause(format!("picture key '{key}' is not owned by the user")),
        ),
        _ => Ok(()),
    }
}

/// Decode an inline picture and clear it from the record; the caller stores
/// the bytes under the returned key.
fn stage_picture(user: &mut User) -> Result<Option<(String, Vec<u8>)>, ServiceError> {
    if user.picture.is_empty() || user.has_profile_pic_key() {
        return Ok(None);
    }
    let data = picture::decode_inline(&user.picture)
        .map_err(|e| ServiceError::IMAGE_DECODING.with_cause(e))?;
    let ext = picture::image_ext(&user.image_type, &data);
    let key = picture::object_key(&user.user_id, &user.profile, &ext);
    user.picture.clear();
    Ok(Some((key, data)))
}
