//! Maps HTTP responses onto the client's outcome and error types.
//!
//! Success bodies are read completely before the pool lease is dropped, so
//! decoding never holds a connection open.

use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::error::{BitbucketError, Result};
use super::executor::PooledResponse;

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATION: usize = 1024 * 1024;

/// Outcome of a request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// A `200 OK` or `201 Created` response with its fully read body.
    Success {
        /// Response status.
        status: StatusCode,
        /// Response body bytes.
        body: Vec<u8>,
    },
    /// `204 No Content`.
    NoContent,
    /// `404 Not Found`.
    NotFound {
        /// URL that returned 404.
        url: String,
    },
}

impl Classified {
    /// Body of a successful response, treating 404 as an error.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::NotFound`] for a 404.
    pub fn into_body(self) -> Result<Vec<u8>> {
        match self {
            Self::Success { body, .. } => Ok(body),
            Self::NoContent => Ok(Vec::new()),
            Self::NotFound { url } => Err(BitbucketError::NotFound { url }),
        }
    }

    /// Body of a successful response, or `None` for a 404.
    #[must_use]
    pub fn into_optional_body(self) -> Option<Vec<u8>> {
        match self {
            Self::Success { body, .. } => Some(body),
            Self::NoContent => Some(Vec::new()),
            Self::NotFound { .. } => None,
        }
    }

    /// Status code behind this outcome.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Success { status, .. } => *status,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

/// Classifies a response and releases its connection.
///
/// # Errors
///
/// Returns [`BitbucketError::Request`] for statuses other than 200, 201, 204
/// and 404,
/// and [`BitbucketError::Transport`] when the body cannot be read.
pub async fn classify(pooled: PooledResponse) -> Result<Classified> {
    let (response, lease, url) = pooled.into_parts();
    let status = response.status();

    let outcome = match status {
        StatusCode::NOT_FOUND => Ok(Classified::NotFound { url }),
        StatusCode::NO_CONTENT => Ok(Classified::NoContent),
        StatusCode::OK | StatusCode::CREATED => read_body(&url, response)
            .await
            .map(|body| Classified::Success { status, body }),
        failure => {
            let body = read_body(&url, response)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            warn!(url = %url, status = failure.as_u16(), "request failed");
            Err(BitbucketError::Request {
                url,
                status: failure.as_u16(),
                reason: failure.canonical_reason().unwrap_or_default().to_owned(),
                body,
            })
        }
    };

    drop(lease);
    outcome
}

/// Decodes a JSON body into `T`.
///
/// # Errors
///
/// Returns [`BitbucketError::Decode`] when the body does not match `T`.
pub fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|error| BitbucketError::decode(url, &error))
}

async fn read_body(url: &str, mut response: reqwest::Response) -> Result<Vec<u8>> {
    let capacity = response
        .content_length()
        .and_then(|length| usize::try_from(length).ok())
        .unwrap_or_default()
        .min(MAX_PREALLOCATION);
    let mut body = Vec::with_capacity(capacity);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|error| BitbucketError::transport(url, &error))?
    {
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
