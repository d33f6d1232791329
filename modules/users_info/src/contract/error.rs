use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Underlying fault carried by a [`ServiceError`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

macro_rules! service_errors {
    ($( $(#[$doc:meta])* $variant:ident => $konst:ident, $code:literal, $msg:literal; )+) => {
        /// Closed set of failures reported by the user service. Every variant
        /// has a fixed code and message and may carry the fault that caused it.
        #[derive(Debug, Clone)]
        pub enum ServiceError {
            $( $(#[$doc])* $variant(Option<Cause>), )+
        }

        impl ServiceError {
            $( pub const $konst: ServiceError = ServiceError::$variant(None); )+

            /// Short catalog code, e.g. `D09`.
            pub fn code(&self) -> &'static str {
                match self {
                    $( ServiceError::$variant(_) => $code, )+
                }
            }

            pub fn message(&self) -> &'static str {
                match self {
                    $( ServiceError::$variant(_) => $msg, )+
                }
            }

            pub fn cause(&self) -> Option<&Cause> {
                match self {
                    $( ServiceError::$variant(c) => c.as_ref(), )+
                }
            }

            fn cause_slot(&mut self) -> &mut Option<Cause> {
                match self {
                    $( ServiceError::$variant(c) => c, )+
                }
            }

            /// Every catalog entry without a cause.
            pub fn catalog() -> Vec<ServiceError> {
                vec![ $( ServiceError::$variant(None), )+ ]
            }
        }
    };
}

service_errors! {
    ClientRequest => CLIENT_REQUEST, "A01", "Error sending function request.";
    ClientRead => CLIENT_READ, "A02", "Error reading function response.";
    ClientInput => CLIENT_INPUT, "A03", "Error reading input file.";
    ClientOutput => CLIENT_OUTPUT, "A04", "Error writing to output file.";
    ClientProtocol => CLIENT_PROTOCOL, "A05", "Error in service communication.";
    ClientImage => CLIENT_IMAGE, "A06", "Error reading image file.";
    Client => CLIENT, "A07", "An internal client error has occurred.";
    CloudStorage => CLOUD_STORAGE, "C01", "Error accessing cloud storage.";
    DbQuery => DB_QUERY, "D01", "Error querying user info.";
    DbScan => DB_SCAN, "D02", "Error scanning user info.";
    DbResults => DB_RESULTS, "D03", "Got unknown results error.";
    DbInsert => DB_INSERT, "D04", "Error inserting user info.";
    DbPrepare => DB_PREPARE, "D05", "Error preparing statement.";
    DbExecute => DB_EXECUTE, "D06", "Error executing statement.";
    DbClient => DB_CLIENT, "D07", "Error getting user info client.";
    DbOpen => DB_OPEN, "D08", "Error opening user info.";
    /// Insert hit an existing composite key.
    DbPKey => DB_PKEY, "D09", "Primary key already exists.";
    DbPKeyMissing => DB_PKEY_MISSING, "D10", "Primary key not found.";
    /// Record key is incomplete; the cause is a [`KeyError`].
    InvalidKey => INVALID_KEY, "I01", "Incomplete user info.";
    InvalidMsg => INVALID_MSG, "I02", "Invalid request message.";
    InternalRead => INTERNAL_READ, "I03", "Error reading request message.";
    InvalidLogin => INVALID_LOGIN, "I04", "Invalid login credentials provided.";
    InvalidToken => INVALID_TOKEN, "I05", "Invalid user access token provided.";
    ExpiredToken => EXPIRED_TOKEN, "I06", "Expired user access token provided.";
    ImageDecoding => IMAGE_DECODING, "P01", "Error decoding image.";
    System => SYSTEM, "S00", "An internal error has occurred.";
    Datetime => DATETIME, "S01", "A datetime error has occurred.";
    Io => IO, "S02", "An input/output error has occurred.";
    /// Confirmation arrived outside the validation window.
    UserValidation => USER_VALIDATION, "U01", "User validation period expired.";
}

impl ServiceError {
    /// Copy of this error carrying `cause`. Templates stay untouched.
    pub fn with_cause<E>(&self, cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        let mut out = self.clone();
        *out.cause_slot() = Some(Arc::from(cause.into()));
        out
    }

    /// Same catalog entry, regardless of cause.
    pub fn is(&self, other: &ServiceError) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Key violation carried by an [`ServiceError::InvalidKey`].
    pub fn key_error(&self) -> Option<KeyError> {
        match self {
            ServiceError::InvalidKey(Some(c)) => c.downcast_ref::<KeyError>().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        if let Some(cause) = self.cause() {
            write!(f, "\n{cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Which part of the composite key is missing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("No user id provided.")]
    NoUserId,
    #[error("No profile id provided.")]
    NoProfileId,
    #[error("No email address provided.")]
    NoEmailAddress,
}

impl From<KeyError> for ServiceError {
    fn from(e: KeyError) -> Self {
        ServiceError::INVALID_KEY.with_cause(e)
    }
}
