//! Process-wide connection pool shared by every client.
//!
//! `reqwest` keeps the actual keep-alive sockets; this module bounds how many
//! requests may be in flight at once, in total and per route, and hands out
//! one shared HTTP client per proxy configuration. A checkout returns a
//! [`PoolLease`] that gives its slot back when dropped, so every exit path
//! (success, error, cancellation) releases the connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use super::credentials::ProxySettings;
use super::error::{BitbucketError, Result};

/// Ceiling on concurrent requests across all routes.
pub const DEFAULT_MAX_TOTAL: usize = 22;
/// Ceiling on concurrent requests to one scheme/host/port.
pub const DEFAULT_MAX_PER_ROUTE: usize = 20;
/// Time allowed to establish a TCP/TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Socket read timeout.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(60);
/// Idle keep-alive sockets older than this are closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// Time a checkout may wait for a free slot.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

/// Limits and timeouts applied by a [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum concurrent requests overall.
    pub max_total: usize,
    /// Maximum concurrent requests per route.
    pub max_per_route: usize,
    /// Connect timeout for new sockets.
    pub connect_timeout: Duration,
    /// Read timeout on established sockets.
    pub socket_timeout: Duration,
    /// Idle timeout after which pooled sockets are dropped.
    pub idle_timeout: Duration,
    /// How long a checkout waits before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_total: DEFAULT_MAX_TOTAL,
            max_per_route: DEFAULT_MAX_PER_ROUTE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

/// A checked-out slot in the pool.
///
/// Dropping the lease returns both the route and the total permit.
#[derive(Debug)]
pub struct PoolLease {
    route: String,
    _route_permit: OwnedSemaphorePermit,
    _total_permit: OwnedSemaphorePermit,
}

impl PoolLease {
    /// The route this lease was taken for.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Bounded pool shared by all clients that talk to the same host.
#[derive(Debug)]
pub struct ConnectionPool {
    settings: PoolSettings,
    total: Arc<Semaphore>,
    routes: Mutex<HashMap<String, Arc<Semaphore>>>,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(PoolSettings::default())
    }
}

impl ConnectionPool {
    /// Creates an empty pool with the given limits.
    #[must_use]
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            total: Arc::new(Semaphore::new(settings.max_total)),
            routes: Mutex::new(HashMap::new()),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The limits this pool enforces.
    #[must_use]
    pub const fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Number of leases currently checked out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.settings
            .max_total
            .saturating_sub(self.total.available_permits())
    }

    /// Returns the shared HTTP client for a proxy configuration, building it
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when the proxy is rejected
    /// or the client cannot be constructed.
    pub fn http_client(&self, proxy: Option<&ProxySettings>) -> Result<reqwest::Client> {
        let key = proxy.map(ProxySettings::key).unwrap_or_default();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = clients.get(&key) {
            return Ok(existing.clone());
        }

        let client = self.build_client(proxy)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Waits for a free slot on `route`.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::ConnectionUnavailable`] when no slot frees up
    /// within the acquisition timeout.
    pub async fn checkout(&self, route: &str) -> Result<PoolLease> {
        let route_slots = self.route_semaphore(route);
        let total_slots = Arc::clone(&self.total);
        let started = Instant::now();

        let acquire = async move {
            let route_permit = route_slots.acquire_owned().await?;
            let total_permit = total_slots.acquire_owned().await?;
            Ok::<_, tokio::sync::AcquireError>((route_permit, total_permit))
        };

        match tokio::time::timeout(self.settings.acquire_timeout, acquire).await {
            Ok(Ok((route_permit, total_permit))) => Ok(PoolLease {
                route: route.to_owned(),
                _route_permit: route_permit,
                _total_permit: total_permit,
            }),
            Ok(Err(_)) | Err(_) => {
                let waited_ms = started.elapsed().as_millis();
                debug!(route, waited_ms, "connection checkout timed out");
                Err(BitbucketError::ConnectionUnavailable {
                    route: route.to_owned(),
                    waited_ms,
                })
            }
        }
    }

    fn route_semaphore(&self, route: &str) -> Arc<Semaphore> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            routes
                .entry(route.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(self.settings.max_per_route))),
        )
    }

    fn build_client(&self, proxy: Option<&ProxySettings>) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.socket_timeout)
            .pool_idle_timeout(self.settings.idle_timeout)
            .pool_max_idle_per_host(self.settings.max_per_route);

        let configured = match proxy {
            Some(settings) => {
                let mut upstream = reqwest::Proxy::all(settings.url().as_str()).map_err(|error| {
                    BitbucketError::Configuration {
                        message: format!("invalid proxy {}: {error}", settings.url()),
                    }
                })?;
                if let Some(credential) = settings.credential() {
                    upstream = upstream.basic_auth(credential.username(), credential.expose_password());
                }
                builder.proxy(upstream)
            }
            None => builder.no_proxy(),
        };

        configured
            .build()
            .map_err(|error| BitbucketError::Configuration {
                message: format!("failed to build HTTP client: {error}"),
            })
    }
}
