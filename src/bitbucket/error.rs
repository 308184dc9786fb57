//! Error types exposed by the Bitbucket client layer.
//!
//! Absence (a `404` at call sites where "nothing there" is a legitimate
//! answer) is not an error: those operations return `Ok(None)`. Everything
//! here is a genuine failure that callers either surface or propagate.

use thiserror::Error;

/// Errors surfaced while talking to Bitbucket Cloud.
///
/// Messages are captured as strings so the error can be cloned and handed to
/// every waiter of a shared cache computation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BitbucketError {
    /// The resource does not exist (HTTP 404) at a call site that requires it.
    #[error("resource not found: {url}")]
    NotFound {
        /// URL that returned 404.
        url: String,
    },

    /// Bitbucket answered with an unexpected status code.
    #[error("HTTP request error for {url}. Status: {status}: {reason}.\n{body}")]
    Request {
        /// URL of the failed request.
        url: String,
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
        /// Response body text, kept for diagnostics.
        body: String,
    },

    /// Networking failed while opening the connection or reading the body.
    #[error("communication error for url {url}: {message}")]
    Transport {
        /// URL that was being requested.
        url: String,
        /// Transport-level error detail.
        message: String,
    },

    /// No pooled connection became available within the acquisition timeout.
    #[error("no connection available for {route} after {waited_ms} ms")]
    ConnectionUnavailable {
        /// Route (scheme, host, port) the checkout was attempted for.
        route: String,
        /// How long the checkout waited before giving up.
        waited_ms: u128,
    },

    /// The caller's cancellation token fired during a retry or between pages.
    #[error("operation cancelled")]
    Cancelled,

    /// The configured rate-limit retry cap was reached.
    ///
    /// Only reachable when a cap is configured; the default policy retries
    /// until Bitbucket answers with something other than a rate-limit status.
    #[error("rate limit still in effect for {url} after {attempts} attempts")]
    RateLimitExhausted {
        /// URL of the throttled request.
        url: String,
        /// Number of rate-limited responses observed.
        attempts: u32,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("I/O error when parsing response from URL: {url}: {message}")]
    Decode {
        /// URL whose body failed to decode.
        url: String,
        /// Decoder error detail.
        message: String,
    },

    /// The request could not be built from the supplied input.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the invalid input.
        message: String,
    },

    /// Bitbucket answered successfully but the payload was unusable.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// Client or CLI configuration was invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

impl BitbucketError {
    /// Wraps a transport failure with the URL that was attempted.
    pub(crate) fn transport(url: &str, error: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    /// Wraps a decoding failure with the URL whose body was being parsed.
    pub(crate) fn decode(url: &str, error: &impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    /// Returns true when the error was caused by cooperative cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A specialised `Result` type for Bitbucket operations.
pub type Result<T> = std::result::Result<T, BitbucketError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::BitbucketError;

    #[rstest]
    fn request_error_includes_status_and_body() {
        let error = BitbucketError::Request {
            url: "https://api.bitbucket.org/2.0/repositories/o/r".to_owned(),
            status: 500,
            reason: "Internal Server Error".to_owned(),
            body: "boom".to_owned(),
        };

        let rendered = error.to_string();
        assert!(rendered.contains("Status: 500: Internal Server Error"), "{rendered}");
        assert!(rendered.ends_with("boom"), "{rendered}");
    }

    #[rstest]
    fn transport_error_mentions_url() {
        let error = BitbucketError::Transport {
            url: "https://api.bitbucket.org/x".to_owned(),
            message: "connection reset".to_owned(),
        };

        assert_eq!(
            error.to_string(),
            "communication error for url https://api.bitbucket.org/x: connection reset"
        );
    }

    #[rstest]
    #[case::cancelled(BitbucketError::Cancelled, true)]
    #[case::not_found(BitbucketError::NotFound { url: "u".to_owned() }, false)]
    fn is_cancelled_only_for_cancellation(#[case] error: BitbucketError, #[case] expected: bool) {
        assert_eq!(error.is_cancelled(), expected);
    }
}
