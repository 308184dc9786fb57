//! Shared state handed to every client.
//!
//! Build one `ApiResources` when the process starts and pass it to each
//! [`super::BitbucketCloudClient`]; clients never reach for globals.

use std::sync::Arc;

use super::cache::{CacheSettings, SharedCaches};
use super::pool::{ConnectionPool, PoolSettings};

/// The connection pool and lookup caches shared across clients.
#[derive(Debug, Clone, Default)]
pub struct ApiResources {
    pool: Arc<ConnectionPool>,
    caches: Arc<SharedCaches>,
}

impl ApiResources {
    /// Creates a fresh pool and empty caches.
    #[must_use]
    pub fn new(pool: PoolSettings, caches: CacheSettings) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new(pool)),
            caches: Arc::new(SharedCaches::new(caches)),
        }
    }

    /// The shared connection pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// The shared lookup caches.
    #[must_use]
    pub const fn caches(&self) -> &Arc<SharedCaches> {
        &self.caches
    }
}
