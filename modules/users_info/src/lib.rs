//! User account functions: get, add, delete, update and validate user
//! records in a MySQL (or SQLite) `user` table, with profile pictures kept
//! in an object store.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{client, error, model};

pub mod config;
pub mod module;
pub use module::UsersInfo;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
