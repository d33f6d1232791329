use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::contract::error::ServiceError;

pub const ERROR_CODE_HEADER: &str = "CT-Error-Code";

pub fn http_status(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::InvalidKey(_)
        | ServiceError::InvalidMsg(_)
        | ServiceError::InvalidToken(_) => StatusCode::BAD_REQUEST,
        ServiceError::InvalidLogin(_)
        | ServiceError::ExpiredToken(_)
        | ServiceError::UserValidation(_) => StatusCode::FORBIDDEN,
        ServiceError::DbPKeyMissing(_) => StatusCode::NOT_FOUND,
        ServiceError::DbPKey(_) => StatusCode::CONFLICT,
        ServiceError::CloudStorage(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failure response: mapped status, `CT-Error-Code` header and a text body
/// of the context line, the catalog message and the cause when present.
pub fn error_response(context: &str, e: &ServiceError) -> Response {
    let status = http_status(e);
    if status.is_server_error() {
        error!(code = e.code(), error = %e, "{context}");
    } else {
        warn!(code = e.code(), error = %e, "{context}");
    }

    let body = match e.cause() {
        Some(cause) => format!("{context}\n{}\n{cause}", e.message()),
        None => format!("{context}\n{}", e.message()),
    };
    let mut resp = (status, body).into_response();
    resp.headers_mut()
        .insert(ERROR_CODE_HEADER, HeaderValue::from_static(e.code()));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(http_status(&ServiceError::DB_PKEY), StatusCode::CONFLICT);
        assert_eq!(http_status(&ServiceError::DB_PKEY_MISSING), StatusCode::NOT_FOUND);
        assert_eq!(http_status(&ServiceError::INVALID_KEY), StatusCode::BAD_REQUEST);
        assert_eq!(http_status(&ServiceError::USER_VALIDATION), StatusCode::FORBIDDEN);
        assert_eq!(http_status(&ServiceError::CLOUD_STORAGE), StatusCode::BAD_GATEWAY);
        assert_eq!(http_status(&ServiceError::CLIENT_REQUEST), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            http_status(&ServiceError::DB_QUERY.with_cause("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn every_catalog_entry_has_a_status_and_header_value() {
        for e in ServiceError::catalog() {
            let resp = error_response("ctx", &e);
            assert_eq!(resp.status(), http_status(&e));
            assert_eq!(resp.headers()[ERROR_CODE_HEADER], e.code());
        }
    }
}
