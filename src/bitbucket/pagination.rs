//! Cursor pagination over Bitbucket's `{values, next}` envelopes.

use http::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::classify::decode_json;
use super::error::Result;
use super::executor::RequestExecutor;
use super::request::EndpointRequest;

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in server order.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the following page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// The next page URL, ignoring blank values.
    #[must_use]
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.trim().is_empty())
    }
}

/// Walks `next` links until the collection is exhausted.
///
/// The `next` URL is requested exactly as the server sent it. Cancellation is
/// checked between pages; a page fetch that has started always completes.
/// Any failure discards the items gathered so far.
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'executor> {
    executor: &'executor RequestExecutor,
}

impl<'executor> Paginator<'executor> {
    /// Creates a paginator that fetches through `executor`.
    #[must_use]
    pub const fn new(executor: &'executor RequestExecutor) -> Self {
        Self { executor }
    }

    /// Collects every item of every page, in page order.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from any page fetch or decode, and
    /// returns [`super::error::BitbucketError::Cancelled`] when cancelled between
    /// pages.
    pub async fn collect<T: DeserializeOwned>(&self, first: EndpointRequest) -> Result<Vec<T>> {
        let mut request = first;
        let mut items = Vec::new();
        let mut pages: usize = 0;

        loop {
            let body = self.executor.fetch(&request).await?.into_body()?;
            let page: Page<T> = decode_json(request.url().as_str(), &body)?;
            pages += 1;

            let next = page.next_url().map(str::to_owned);
            items.extend(page.values);
            debug!(
                url = %request.url(),
                pages,
                items = items.len(),
                "fetched page"
            );

            let Some(next_url) = next else {
                return Ok(items);
            };
            self.executor.ensure_not_cancelled()?;
            request = EndpointRequest::parse(Method::GET, &next_url)?;
        }
    }

    /// Collects every page, then keeps the items matching `keep`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::collect`].
    pub async fn collect_where<T, P>(&self, first: EndpointRequest, keep: P) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&T) -> bool,
    {
        let mut items = self.collect(first).await?;
        items.retain(keep);
        Ok(items)
    }
}
