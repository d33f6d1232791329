//! Pool options application shared by the backends.

use crate::ConnectOpts;

/// Applies [`ConnectOpts`] to a backend-specific pool builder.
pub(crate) trait ApplyPoolOpts<T> {
    fn apply(self, opts: &ConnectOpts) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($builder:ty) => {
        impl ApplyPoolOpts<$builder> for $builder {
            fn apply(mut self, opts: &ConnectOpts) -> Self {
                if let Some(n) = opts.max_conns {
                    self = self.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    self = self.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    self = self.acquire_timeout(t);
                }
                if let Some(t) = opts.idle_timeout {
                    self = self.idle_timeout(t);
                }
                if let Some(t) = opts.max_lifetime {
                    self = self.max_lifetime(t);
                }
                if opts.test_before_acquire {
                    self = self.test_before_acquire(true);
                }
                self
            }
        }
    };
}

#[cfg(feature = "mysql")]
impl_apply_pool_opts!(sqlx::mysql::MySqlPoolOptions);

#[cfg(feature = "sqlite")]
impl_apply_pool_opts!(sqlx::sqlite::SqlitePoolOptions);
