//! Per-engine statement execution. Both engines run the same statements;
//! the macro stamps out one module per concrete pool type.

use chrono::NaiveDateTime;

use crate::contract::model::User;
use crate::domain::timestamp::Timestamp;

/// Columns read back for one user.
#[derive(Debug, Default)]
pub struct StoredRow {
    pub password: Option<String>,
    pub picture: Option<String>,
    pub token: Option<String>,
    pub last_login: Option<NaiveDateTime>,
    pub validated: Option<NaiveDateTime>,
}

impl StoredRow {
    pub fn apply_to(self, user: &mut User) {
        user.password = self.password.unwrap_or_default();
        user.picture = self.picture.unwrap_or_default();
        user.token = self.token.unwrap_or_default();
        user.last_login = self
            .last_login
            .map(|t| Timestamp::from_naive(t).to_string())
            .unwrap_or_default();
        user.validated = self
            .validated
            .map(|t| Timestamp::from_naive(t).to_string())
            .unwrap_or_default();
    }
}

macro_rules! engine_ops {
    ($engine:ident, $pool:ty) => {
        pub mod $engine {
            use chrono::NaiveDateTime;
            use sqlx::{Executor, Row, Statement};

            use super::StoredRow;
            use crate::contract::error::ServiceError;
            use crate::contract::model::User;
            use crate::infra::storage::{errors, sql};

            pub async fn fetch(pool: &$pool, user: &User) -> Result<Option<StoredRow>, ServiceError> {
                let mut conn = pool.acquire().await.map_err(errors::open_failed)?;
                let stmt = (&mut *conn)
                    .prepare(sql::SELECT_USER)
                    .await
                    .map_err(errors::prepare_failed)?;
                let row = stmt
                    .query()
                    .bind(user.user_id.clone())
                    .bind(user.profile.clone())
                    .bind(user.email.clone())
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(errors::query_failed)?;

                let Some(row) = row else {
                    return Ok(None);
                };
                Ok(Some(StoredRow {
                    password: row.try_get("ctpass").map_err(errors::query_failed)?,
                    picture: row.try_get("ctppic").map_err(errors::query_failed)?,
                    token: row.try_get("atoken").map_err(errors::query_failed)?,
                    last_login: row.try_get("llogin").map_err(errors::query_failed)?,
                    validated: row.try_get("uvalid").map_err(errors::query_failed)?,
                }))
            }

            pub async fn insert(pool: &$pool, user: &User) -> Result<(), ServiceError> {
                let mut conn = pool.acquire().await.map_err(errors::open_failed)?;
                let stmt = (&mut *conn)
                    .prepare(sql::INSERT_USER)
                    .await
                    .map_err(errors::prepare_failed)?;
                stmt.query()
                    .bind(user.user_id.clone())
                    .bind(user.password.clone())
                    .bind(user.profile.clone())
                    .bind(user.email.clone())
                    .bind(user.picture.clone())
                    .execute(&mut *conn)
                    .await
                    .map_err(errors::insert_failed)?;
                Ok(())
            }

            pub async fn delete(pool: &$pool, user: &User) -> Result<(), ServiceError> {
                let mut conn = pool.acquire().await.map_err(errors::open_failed)?;
                let stmt = (&mut *conn)
                    .prepare(sql::DELETE_USER)
                    .await
                    .map_err(errors::prepare_failed)?;
                stmt.query()
                    .bind(user.user_id.clone())
                    .bind(user.profile.clone())
                    .bind(user.email.clone())
                    .execute(&mut *conn)
                    .await
                    .map_err(errors::execute_failed)?;
                Ok(())
            }

            /// Main column update, then one statement per present stamp.
            pub async fn update(
                pool: &$pool,
                user: &User,
                last_login: Option<NaiveDateTime>,
                validated: Option<NaiveDateTime>,
            ) -> Result<(), ServiceError> {
                let mut conn = pool.acquire().await.map_err(errors::open_failed)?;
                let stmt = (&mut *conn)
                    .prepare(sql::UPDATE_USER)
                    .await
                    .map_err(errors::prepare_failed)?;
                stmt.query()
                    .bind(user.password.clone())
                    .bind(user.picture.clone())
                    .bind(user.token.clone())
                    .bind(user.user_id.clone())
                    .bind(user.profile.clone())
                    .bind(user.email.clone())
                    .execute(&mut *conn)
                    .await
                    .map_err(errors::execute_failed)?;

                for (statement, stamp) in [
                    (sql::UPDATE_LAST_LOGIN, last_login),
                    (sql::UPDATE_VALIDATED, validated),
                ] {
                    let Some(stamp) = stamp else { continue };
                    let stmt = (&mut *conn)
                        .prepare(statement)
                        .await
                        .map_err(errors::prepare_failed)?;
                    stmt.query()
                        .bind(stamp)
                        .bind(user.user_id.clone())
                        .bind(user.profile.clone())
                        .bind(user.email.clone())
                        .execute(&mut *conn)
                        .await
                        .map_err(errors::execute_failed)?;
                }
                Ok(())
            }

            pub async fn create_schema(pool: &$pool) -> Result<(), ServiceError> {
                let mut conn = pool.acquire().await.map_err(errors::open_failed)?;
                (&mut *conn)
                    .execute(sql::CREATE_USER_TABLE)
                    .await
                    .map_err(errors::execute_failed)?;
                Ok(())
            }
        }
    };
}

engine_ops!(mysql, sqlx::MySqlPool);
engine_ops!(sqlite, sqlx::SqlitePool);
