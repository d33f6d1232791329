use sqlx::error::ErrorKind;

use crate::contract::error::ServiceError;

/// MySQL `ER_DUP_ENTRY`.
const MYSQL_DUP_ENTRY: &str = "1062";

/// Text of a duplicate-key violation as MySQL and SQLite word it.
pub fn is_duplicate_key_message(code: Option<&str>, message: &str) -> bool {
    code == Some(MYSQL_DUP_ENTRY)
        || message.starts_with("Duplicate entry")
        || message.starts_with("UNIQUE constraint failed")
}

pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.kind() == ErrorKind::UniqueViolation
                || is_duplicate_key_message(db.code().as_deref(), db.message())
        }
        _ => false,
    }
}

pub fn open_failed(e: sqlx::Error) -> ServiceError {
    ServiceError::DB_OPEN.with_cause(e)
}

pub fn prepare_failed(e: sqlx::Error) -> ServiceError {
    ServiceError::DB_PREPARE.with_cause(e)
}

pub fn query_failed(e: sqlx::Error) -> ServiceError {
    let template = match &e {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => ServiceError::DB_SCAN,
        sqlx::Error::Protocol(_) | sqlx::Error::RowNotFound => ServiceError::DB_RESULTS,
        _ => ServiceError::DB_QUERY,
    };
    template.with_cause(e)
}

pub fn insert_failed(e: sqlx::Error) -> ServiceError {
    if is_duplicate_key(&e) {
        ServiceError::DB_PKEY.with_cause(e)
    } else {
        ServiceError::DB_INSERT.with_cause(e)
    }
}

pub fn execute_failed(e: sqlx::Error) -> ServiceError {
    ServiceError::DB_EXECUTE.with_cause(e)
}
