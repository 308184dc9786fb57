//! Immutable description of a single HTTP call.

use http::Method;
use serde::Serialize;
use url::Url;

use super::error::{BitbucketError, Result};
use super::template::UriTemplate;

/// Content type used for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type used for form-encoded request bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Pre-serialised JSON text.
    Json(String),
    /// Ordered name/value pairs sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Serialises a value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when the value cannot be
    /// represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_string(value)
            .map(Self::Json)
            .map_err(|error| BitbucketError::InvalidRequest {
                message: format!("failed to serialise request body: {error}"),
            })
    }

    /// Returns the content type matching this body.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => JSON_CONTENT_TYPE,
            Self::Form(_) => FORM_CONTENT_TYPE,
        }
    }

    /// Encodes the body into the bytes sent on the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Json(text) => text.clone(),
            Self::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish(),
        }
    }
}

/// An absolute URL, an HTTP method, and an optional body.
///
/// Built once per call and reused unchanged for every rate-limit retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRequest {
    url: Url,
    method: Method,
    body: Option<RequestBody>,
}

impl EndpointRequest {
    /// Creates a bodiless request for an already absolute URL.
    #[must_use]
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            body: None,
        }
    }

    /// Expands a template against the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when the template is
    /// malformed or the expansion is not a valid URL.
    pub fn from_template(method: Method, base: &str, template: &UriTemplate) -> Result<Self> {
        let expanded = template.expand()?;
        let joined = format!("{}{expanded}", base.trim_end_matches('/'));
        Self::parse(method, &joined)
    }

    /// Parses an absolute URL string, such as a pagination `next` link.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when the URL cannot be parsed.
    pub fn parse(method: Method, raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|error| BitbucketError::InvalidRequest {
            message: format!("invalid URL `{raw}`: {error}"),
        })?;
        Ok(Self::new(method, url))
    }

    /// Attaches a body to the request.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// The target URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// The content type implied by the body.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        self.body.as_ref().map(RequestBody::content_type)
    }

    /// Pool route key: scheme, host and port of the target.
    #[must_use]
    pub fn route(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port_or_known_default() {
            Some(port) => format!("{}://{host}:{port}", self.url.scheme()),
            None => format!("{}://{host}", self.url.scheme()),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use rstest::rstest;
    use serde_json::json;

    use super::{EndpointRequest, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, RequestBody};
    use crate::bitbucket::error::BitbucketError;
    use crate::bitbucket::template::UriTemplate;

    #[rstest]
    fn from_template_joins_base_without_double_slash() {
        let template = UriTemplate::new("/2.0/repositories{/owner,repo}")
            .set("owner", "acme")
            .set("repo", "rocket");

        let request =
            EndpointRequest::from_template(Method::GET, "https://api.bitbucket.org/", &template)
                .expect("request should build");

        assert_eq!(
            request.url().as_str(),
            "https://api.bitbucket.org/2.0/repositories/acme/rocket"
        );
        assert_eq!(request.method(), &Method::GET);
        assert!(request.body().is_none());
        assert!(request.content_type().is_none());
    }

    #[rstest]
    #[case::https("https://api.bitbucket.org/2.0", "https://api.bitbucket.org:443")]
    #[case::explicit_port("http://127.0.0.1:8123/2.0", "http://127.0.0.1:8123")]
    fn route_includes_known_default_port(#[case] raw: &str, #[case] expected: &str) {
        let request = EndpointRequest::parse(Method::GET, raw).expect("URL should parse");

        assert_eq!(request.route(), expected);
    }

    #[rstest]
    fn parse_rejects_relative_urls() {
        let result = EndpointRequest::parse(Method::GET, "/2.0/repositories");

        assert!(matches!(result, Err(BitbucketError::InvalidRequest { .. })));
    }

    #[rstest]
    fn form_body_is_url_encoded() {
        let body = RequestBody::Form(vec![("content".to_owned(), "looks good & ships".to_owned())]);

        assert_eq!(body.content_type(), FORM_CONTENT_TYPE);
        assert_eq!(body.encode(), "content=looks+good+%26+ships");
    }

    #[rstest]
    fn json_body_serialises_value() {
        let body = RequestBody::json(&json!({"state": "SUCCESSFUL"})).expect("serialisable");

        assert_eq!(body.content_type(), JSON_CONTENT_TYPE);
        assert_eq!(body.encode(), r#"{"state":"SUCCESSFUL"}"#);
    }
}
