pub mod client;
pub mod error;
pub mod model;

pub use client::{DbClientProvider, UserDbClient};
pub use error::{Cause, KeyError, ServiceError};
pub use model::{User, UserList, PIC_KEY_TAG, PWD_HASH_TAG};
