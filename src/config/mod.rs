//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in client defaults
//! 2. **Configuration file** – `.bitbucket-cloud.toml` in current directory,
//!    home directory, or XDG config directory
//! 3. **Environment variables** – `BITBUCKET_OWNER`, `BITBUCKET_USERNAME`, …
//! 4. **Command-line arguments** – `--owner`/`-o`, `--repo`/`-r`, …
//!
//! # Configuration File
//!
//! ```toml
//! owner = "acme"
//! repo = "rocket"
//! username = "ci-bot"
//! password = "app-password"
//! branch_filter = "main,develop"
//! rate_limit_delay_ms = 5000
//! ```

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::bitbucket::cache::CacheSettings;
use crate::bitbucket::client::{ClientOptions, DEFAULT_API_BASE};
use crate::bitbucket::credentials::{Credential, ProxySettings};
use crate::bitbucket::error::{BitbucketError, Result};
use crate::bitbucket::executor::RetryPolicy;
use crate::bitbucket::models::BranchFilter;

const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 5_000;
const DEFAULT_TEAM_CACHE_TTL_SECONDS: u64 = 6 * 60 * 60;
const DEFAULT_REPOSITORY_CACHE_TTL_SECONDS: u64 = 3 * 60 * 60;

/// Client configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use bitbucket_cloud::BitbucketConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = BitbucketConfig::load().expect("failed to load configuration");
/// let (owner, repo) = config.require_repository_info().expect("owner and repo required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "BITBUCKET",
    discovery(
        dotfile_name = ".bitbucket-cloud.toml",
        config_file_name = "bitbucket-cloud.toml",
        app_name = "bitbucket-cloud"
    )
)]
pub struct BitbucketConfig {
    /// Repository owner (user or team).
    ///
    /// Can be provided via:
    /// - CLI: `--owner <OWNER>` or `-o <OWNER>`
    /// - Environment: `BITBUCKET_OWNER`
    /// - Config file: `owner = "..."`
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository slug.
    ///
    /// Can be provided via:
    /// - CLI: `--repo <REPO>` or `-r <REPO>`
    /// - Environment: `BITBUCKET_REPO`
    /// - Config file: `repo = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Login used for HTTP Basic authentication.
    ///
    /// Must be set together with `password`.
    #[ortho_config(cli_short = 'u')]
    pub username: Option<String>,

    /// App password used for HTTP Basic authentication.
    ///
    /// Must be set together with `username`.
    #[ortho_config(cli_short = 'p')]
    pub password: Option<String>,

    /// API scheme and host; defaults to `https://api.bitbucket.org`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Upstream HTTP proxy address.
    #[ortho_config()]
    pub proxy_url: Option<String>,

    /// Proxy login; must be set together with `proxy_password`.
    #[ortho_config()]
    pub proxy_username: Option<String>,

    /// Proxy password; must be set together with `proxy_username`.
    #[ortho_config()]
    pub proxy_password: Option<String>,

    /// Comma-separated branch names to restrict branch listings to.
    #[ortho_config()]
    pub branch_filter: Option<String>,

    /// Wait between rate-limited attempts, in milliseconds.
    ///
    /// Defaults to 5 seconds.
    #[ortho_config()]
    pub rate_limit_delay_ms: u64,

    /// Maximum rate-limit retries per request; unset retries forever.
    #[ortho_config()]
    pub rate_limit_max_retries: Option<u32>,

    /// Lifetime of cached team lookups, in seconds.
    ///
    /// Defaults to 6 hours.
    #[ortho_config()]
    pub team_cache_ttl_seconds: u64,

    /// Lifetime of cached repository listings, in seconds.
    ///
    /// Defaults to 3 hours.
    #[ortho_config()]
    pub repository_cache_ttl_seconds: u64,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            username: None,
            password: None,
            api_base: None,
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            branch_filter: None,
            rate_limit_delay_ms: DEFAULT_RATE_LIMIT_DELAY_MS,
            rate_limit_max_retries: None,
            team_cache_ttl_seconds: DEFAULT_TEAM_CACHE_TTL_SECONDS,
            repository_cache_ttl_seconds: DEFAULT_REPOSITORY_CACHE_TTL_SECONDS,
        }
    }
}

impl BitbucketConfig {
    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when owner or repo is missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str)> {
        match (non_blank(self.owner.as_deref()), non_blank(self.repo.as_deref())) {
            (Some(owner), Some(repo)) => Ok((owner, repo)),
            (None, _) => Err(BitbucketError::Configuration {
                message: "repository owner is required (use --owner or -o)".to_owned(),
            }),
            (_, None) => Err(BitbucketError::Configuration {
                message: "repository name is required (use --repo or -r)".to_owned(),
            }),
        }
    }

    /// Resolves the Basic authentication credential.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when only one of username
    /// and password is set.
    pub fn resolve_credential(&self) -> Result<Option<Credential>> {
        resolve_pair(
            self.username.as_deref(),
            self.password.as_deref(),
            "username and password must be set together",
        )
    }

    /// Resolves the upstream proxy.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when the address is invalid
    /// or only one of the proxy username and password is set.
    pub fn resolve_proxy(&self) -> Result<Option<ProxySettings>> {
        let Some(address) = non_blank(self.proxy_url.as_deref()) else {
            return Ok(None);
        };
        let credential = resolve_pair(
            self.proxy_username.as_deref(),
            self.proxy_password.as_deref(),
            "proxy username and proxy password must be set together",
        )?;
        ProxySettings::new(address, credential).map(Some)
    }

    /// The API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        non_blank(self.api_base.as_deref()).unwrap_or(DEFAULT_API_BASE)
    }

    /// Rate-limit retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.rate_limit_delay_ms),
            self.rate_limit_max_retries,
        )
    }

    /// Lifetimes for the shared caches.
    #[must_use]
    pub const fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            team_ttl: Duration::from_secs(self.team_cache_ttl_seconds),
            repository_ttl: Duration::from_secs(self.repository_cache_ttl_seconds),
        }
    }

    /// Branch filter parsed from `branch_filter`; empty when unset.
    #[must_use]
    pub fn branch_filter(&self) -> BranchFilter {
        self.branch_filter
            .as_deref()
            .map(BranchFilter::from_csv)
            .unwrap_or_default()
    }

    /// Builds client options from the resolved settings.
    ///
    /// # Errors
    ///
    /// Propagates credential and proxy resolution failures.
    pub fn client_options(&self, cancellation: CancellationToken) -> Result<ClientOptions> {
        Ok(ClientOptions {
            api_base: self.api_base().to_owned(),
            credential: self.resolve_credential()?,
            proxy: self.resolve_proxy()?,
            retry: self.retry_policy(),
            cancellation,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

fn resolve_pair(
    username: Option<&str>,
    password: Option<&str>,
    mismatch: &str,
) -> Result<Option<Credential>> {
    let secret = password.filter(|value| !value.trim().is_empty());
    match (non_blank(username), secret) {
        (Some(user), Some(pass)) => Credential::new(user, pass).map(Some),
        (None, None) => Ok(None),
        _ => Err(BitbucketError::Configuration {
            message: mismatch.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests;
