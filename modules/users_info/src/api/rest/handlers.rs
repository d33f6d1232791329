use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use tracing::{debug, info, warn};

use crate::api::rest::dto::{outcome_body, user_info_body, Outcome};
use crate::api::rest::error::error_response;
use crate::config::FunctionNames;
use crate::contract::error::ServiceError;
use crate::contract::model::{User, UserList};
use crate::domain::service::Service;

pub const FUNCTION_NAME_HEADER: &str = "CT-Function-Name";

/// Fetch a stored user.
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Extension(names): Extension<Arc<FunctionNames>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    info!("executing get_user");
    const OP: &str = "Error reading user info";

    let user = match read_user(&headers, &names.get_user, body, OP) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match svc.get_user(user.clone()).await {
        Ok(found) => text(StatusCode::OK, user_info_body(&found)),
        Err(e) => error_response(&context(OP, &user), &e),
    }
}

/// Create a user.
pub async fn add_user(
    Extension(svc): Extension<Arc<Service>>,
    Extension(names): Extension<Arc<FunctionNames>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    info!("executing add_user");
    const OP: &str = "Error adding new user";

    let user = match read_user(&headers, &names.add_user, body, OP) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match svc.add_user(user.clone()).await {
        Ok(added) => text(StatusCode::CREATED, outcome_body(&added, Outcome::Added)),
        Err(e) if e.is(&ServiceError::DB_PKEY) => {
            let ctx = format!("{OP}: {}/{} - user exists.", user.user_id, user.profile);
            error_response(&ctx, &e)
        }
        Err(e) => error_response(&context(OP, &user), &e),
    }
}

/// Remove a user and its picture.
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    Extension(names): Extension<Arc<FunctionNames>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    info!("executing delete_user");
    const OP: &str = "Error deleting user";

    let user = match read_user(&headers, &names.delete_user, body, OP) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match svc.delete_user(user.clone()).await {
        Ok(deleted) => text(StatusCode::OK, outcome_body(&deleted, Outcome::Deleted)),
        Err(e) => error_response(&context(OP, &user), &e),
    }
}

/// Rewrite password, picture, token and timestamps.
pub async fn update_user(
    Extension(svc): Extension<Arc<Service>>,
    Extension(names): Extension<Arc<FunctionNames>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    info!("executing update_user");
    const OP: &str = "Error updating user";

    let user = match read_user(&headers, &names.update_user, body, OP) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match svc.update_user(user.clone()).await {
        Ok(updated) => text(StatusCode::OK, outcome_body(&updated, Outcome::Updated)),
        Err(e) => error_response(&context(OP, &user), &e),
    }
}

/// Confirm a freshly created user.
pub async fn validate_user(
    Extension(svc): Extension<Arc<Service>>,
    Extension(names): Extension<Arc<FunctionNames>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    info!("executing validate_user");
    const OP: &str = "Error validating user info";

    let user = match read_user(&headers, &names.validate_user, body, OP) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match svc.validate_user(user.clone()).await {
        Ok(v) => text(StatusCode::OK, outcome_body(v.user(), Outcome::Validated)),
        Err(e) => error_response(&context(OP, &user), &e),
    }
}

/// Check the function header, then decode the first user of the body.
fn read_user(
    headers: &HeaderMap,
    expected: &str,
    body: Result<Bytes, BytesRejection>,
    op: &str,
) -> Result<User, Response> {
    match headers
        .get(FUNCTION_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(name) if name == expected => {}
        Some(name) => {
            warn!(expected, got = name, "request function mismatch");
            let e = ServiceError::INVALID_MSG.with_cause(format!("function '{name}' not served here"));
            return Err(error_response(&format!("{op}."), &e));
        }
        None => {
            warn!("request missing {FUNCTION_NAME_HEADER} header");
            let e = ServiceError::INVALID_MSG.with_cause(format!("missing {FUNCTION_NAME_HEADER} header"));
            return Err(error_response(&format!("{op}."), &e));
        }
    }

    let body = body.map_err(|rejection| {
        let e = ServiceError::INTERNAL_READ.with_cause(rejection.body_text());
        error_response("Error reading request body.", &e)
    })?;

    let list: UserList = serde_json::from_slice(&body).map_err(|err| {
        let e = ServiceError::INVALID_MSG.with_cause(err);
        error_response("Error converting request body.", &e)
    })?;

    let user = list.users.into_iter().next().ok_or_else(|| {
        let e = ServiceError::INVALID_MSG.with_cause("request holds no users");
        error_response("Error converting request body.", &e)
    })?;
    debug!(user_id = %user.user_id, profile = %user.profile, "request decoded");
    Ok(user)
}

fn context(op: &str, user: &User) -> String {
    if user.user_id.is_empty() {
        format!("{op}.")
    } else {
        format!("{op}: {}/{}.", user.user_id, user.profile)
    }
}

fn text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
