//! Authenticated request execution with the rate-limit retry loop.
//!
//! Bitbucket signals throttling with `429 Too Many Requests` and no
//! `Retry-After` hint, so the executor waits a fixed delay and sends the same
//! request again. The connection is handed back to the pool before waiting.
//! The caller's cancellation token is checked on every cycle and raced
//! against the sleep.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::classify::{Classified, classify};
use super::credentials::{Credential, ProxySettings};
use super::error::{BitbucketError, Result};
use super::pool::{ConnectionPool, PoolLease};
use super::request::EndpointRequest;

/// Status Bitbucket uses to signal throttling.
pub const RATE_LIMIT_STATUS: StatusCode = StatusCode::TOO_MANY_REQUESTS;

/// Default wait between rate-limited attempts.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// How rate-limited requests are retried.
///
/// The default retries without limit after a fixed delay. Setting
/// `max_retries` turns an endless throttle into
/// [`BitbucketError::RateLimitExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RATE_LIMIT_DELAY,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with an explicit delay and optional retry cap.
    #[must_use]
    pub const fn new(delay: Duration, max_retries: Option<u32>) -> Self {
        Self { delay, max_retries }
    }

    /// Wait between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Maximum number of retries, or `None` for unbounded.
    #[must_use]
    pub const fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    const fn allows(&self, rate_limited: u32) -> bool {
        match self.max_retries {
            Some(max) => rate_limited <= max,
            None => true,
        }
    }
}

/// A non-throttled response together with the pool slot it occupies.
#[derive(Debug)]
pub struct PooledResponse {
    response: reqwest::Response,
    lease: PoolLease,
    url: String,
}

impl PooledResponse {
    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// URL the response was fetched from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Splits into the raw response, its lease, and the request URL.
    #[must_use]
    pub fn into_parts(self) -> (reqwest::Response, PoolLease, String) {
        (self.response, self.lease, self.url)
    }
}

/// Sends requests through the shared pool on behalf of one client.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    pool: Arc<ConnectionPool>,
    http: reqwest::Client,
    credential: Option<Credential>,
    retry: RetryPolicy,
    cancellation: CancellationToken,
}

impl RequestExecutor {
    /// Creates an executor, resolving the proxy once.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when the HTTP client for the
    /// proxy cannot be built.
    pub fn new(
        pool: Arc<ConnectionPool>,
        proxy: Option<&ProxySettings>,
        credential: Option<Credential>,
        retry: RetryPolicy,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        let http = pool.http_client(proxy)?;
        Ok(Self {
            pool,
            http,
            credential,
            retry,
            cancellation,
        })
    }

    /// Credential attached to every request, if any.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// The retry policy in force.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fails with [`BitbucketError::Cancelled`] if the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Cancelled`] after cancellation.
    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(BitbucketError::Cancelled);
        }
        Ok(())
    }

    /// Sends `request`, retrying while Bitbucket answers with a rate limit.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Transport`] when the exchange fails,
    /// [`BitbucketError::ConnectionUnavailable`] when the pool stays
    /// saturated, [`BitbucketError::Cancelled`] when the token fires while
    /// throttled, and [`BitbucketError::RateLimitExhausted`] when a retry cap
    /// is configured and reached.
    pub async fn execute(&self, request: &EndpointRequest) -> Result<PooledResponse> {
        let url = request.url().as_str();
        let route = request.route();
        let mut rate_limited: u32 = 0;

        loop {
            let lease = self.pool.checkout(&route).await?;
            debug!(method = %request.method(), url, "sending request");
            let response = self
                .prepare(request)
                .send()
                .await
                .map_err(|error| BitbucketError::transport(url, &error))?;

            if response.status() != RATE_LIMIT_STATUS {
                return Ok(PooledResponse {
                    response,
                    lease,
                    url: url.to_owned(),
                });
            }

            drop(response);
            drop(lease);
            rate_limited = rate_limited.saturating_add(1);
            if !self.retry.allows(rate_limited) {
                return Err(BitbucketError::RateLimitExhausted {
                    url: url.to_owned(),
                    attempts: rate_limited,
                });
            }
            self.wait_before_retry(url, rate_limited).await?;
        }
    }

    /// Sends `request` and classifies the response.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::execute`] failures and returns
    /// [`BitbucketError::Request`] for unexpected statuses.
    pub async fn fetch(&self, request: &EndpointRequest) -> Result<Classified> {
        let response = self.execute(request).await?;
        classify(response).await
    }

    async fn wait_before_retry(&self, url: &str, attempt: u32) -> Result<()> {
        self.ensure_not_cancelled()?;
        let delay = self.retry.delay();
        debug!(
            url,
            attempt,
            delay_ms = delay.as_millis(),
            "rate limited, waiting before retry"
        );

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(BitbucketError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn prepare(&self, request: &EndpointRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone());
        if let Some(credential) = &self.credential {
            builder = builder.basic_auth(credential.username(), Some(credential.expose_password()));
        }
        if let Some(body) = request.body() {
            builder = builder
                .header(http::header::CONTENT_TYPE, body.content_type())
                .body(body.encode());
        }
        builder
    }
}
