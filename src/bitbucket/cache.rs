//! Time-bounded lookup caches with single-flight population.
//!
//! Backed by `moka`, whose `try_get_with` lets exactly one caller run the
//! computation for a key while concurrent callers for the same key wait on
//! that result. Failed computations are not stored, so the next caller
//! retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use super::error::{BitbucketError, Result};
use super::models::{Repository, Team, UserRole};

/// Default lifetime of cached team lookups.
pub const DEFAULT_TEAM_TTL: Duration = Duration::from_secs(6 * 60 * 60);
/// Default lifetime of cached repository listings.
pub const DEFAULT_REPOSITORY_TTL: Duration = Duration::from_secs(3 * 60 * 60);

const MAX_ENTRIES: u64 = 10_000;
const ANONYMOUS: &str = "anonymous";

/// A string-keyed cache whose entries expire a fixed time after insertion.
#[derive(Debug, Clone)]
pub struct TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    ttl: Duration,
    inner: Cache<String, V>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key`, running `compute` on a miss.
    ///
    /// Concurrent callers with the same key share one computation. A failed
    /// computation is handed to every waiter and leaves the key empty.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `compute`.
    pub async fn get_or_try_insert_with<F>(&self, key: String, compute: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        let name = self.name;
        let logged_key = key.clone();
        let populate = async move {
            debug!(cache = name, key = %logged_key, "cache miss");
            compute.await
        };

        self.inner
            .try_get_with(key, populate)
            .await
            .map_err(Arc::<BitbucketError>::unwrap_or_clone)
    }
}

/// Lifetimes for the shared caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Lifetime of team lookups.
    pub team_ttl: Duration,
    /// Lifetime of repository listings.
    pub repository_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            team_ttl: DEFAULT_TEAM_TTL,
            repository_ttl: DEFAULT_REPOSITORY_TTL,
        }
    }
}

/// The two process-wide lookup caches.
#[derive(Debug, Clone)]
pub struct SharedCaches {
    teams: TtlCache<Option<Team>>,
    repositories: TtlCache<Vec<Repository>>,
}

impl Default for SharedCaches {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl SharedCaches {
    /// Creates empty caches with the given lifetimes.
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            teams: TtlCache::new("teams", settings.team_ttl),
            repositories: TtlCache::new("repositories", settings.repository_ttl),
        }
    }

    /// Team lookups; `None` records that the owner is not a team.
    #[must_use]
    pub const fn teams(&self) -> &TtlCache<Option<Team>> {
        &self.teams
    }

    /// Repository listings.
    #[must_use]
    pub const fn repositories(&self) -> &TtlCache<Vec<Repository>> {
        &self.repositories
    }
}

/// Builders for cache keys.
///
/// Every key carries the API base URL and the caller's login, so clients that
/// share one set of caches but see different data never read each other's
/// entries.
pub struct CacheKey;

impl CacheKey {
    /// Key for a team lookup.
    #[must_use]
    pub fn team(api_base: &str, owner: &str, login: Option<&str>) -> String {
        format!("team::{api_base}::{owner}::{}", login.unwrap_or(ANONYMOUS))
    }

    /// Key for a repository listing, qualified by the role filter when one
    /// was applied.
    #[must_use]
    pub fn repositories(
        api_base: &str,
        owner: &str,
        login: Option<&str>,
        role: Option<UserRole>,
    ) -> String {
        let base = format!(
            "repositories::{api_base}::{owner}::{}",
            login.unwrap_or(ANONYMOUS)
        );
        match role {
            Some(filter) => format!("{base}::{}", filter.id()),
            None => base,
        }
    }
}
