//! Resolved authentication and proxy settings.
//!
//! Credentials are resolved once when a client is built and never change
//! afterwards. Secrets are held in [`SecretString`] so they stay out of
//! `Debug` output and logs.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::error::{BitbucketError, Result};

/// Username and password used for HTTP Basic authentication.
#[derive(Debug, Clone)]
pub struct Credential {
    username: String,
    password: SecretString,
}

impl Credential {
    /// Creates a credential, rejecting blank usernames or passwords.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when either part is blank.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(BitbucketError::Configuration {
                message: "username must not be empty".to_owned(),
            });
        }
        if password.trim().is_empty() {
            return Err(BitbucketError::Configuration {
                message: "password must not be empty".to_owned(),
            });
        }
        Ok(Self {
            username: trimmed.to_owned(),
            password: SecretString::from(password.to_owned()),
        })
    }

    /// The login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, exposed for header construction only.
    #[must_use]
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Upstream proxy resolved from configuration.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    url: Url,
    credential: Option<Credential>,
}

impl ProxySettings {
    /// Parses a proxy address.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when the address is not a
    /// valid absolute URL.
    pub fn new(address: &str, credential: Option<Credential>) -> Result<Self> {
        let url = Url::parse(address).map_err(|error| BitbucketError::Configuration {
            message: format!("invalid proxy address `{address}`: {error}"),
        })?;
        Ok(Self { url, credential })
    }

    /// The proxy URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Proxy authentication, if configured.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Key identifying clients that can share a transport.
    ///
    /// Two settings with the same address and proxy login reuse one
    /// underlying HTTP client.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.credential {
            Some(credential) => format!("{}#{}", self.url, credential.username()),
            None => self.url.to_string(),
        }
    }
}
