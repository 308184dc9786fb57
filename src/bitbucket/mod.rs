//! Bitbucket Cloud REST client.
//!
//! The transport core is layered leaves first: a shared [`ConnectionPool`]
//! bounds concurrency, the [`RequestExecutor`] sends authenticated requests
//! and absorbs rate limiting, [`classify`] turns responses into outcomes,
//! and the [`Paginator`] walks `next` links. [`BitbucketCloudClient`]
//! composes these into repository operations, with team and repository
//! lookups served from [`SharedCaches`].

pub mod api;
pub mod cache;
pub mod classify;
pub mod client;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod intake;
pub mod models;
pub mod pagination;
pub mod pool;
pub mod request;
pub mod resources;
pub mod template;

pub use api::BitbucketApi;
pub use cache::{CacheKey, CacheSettings, SharedCaches, TtlCache};
pub use classify::{Classified, classify};
pub use client::{BitbucketCloudClient, ClientOptions, DEFAULT_API_BASE};
pub use credentials::{Credential, ProxySettings};
pub use error::{BitbucketError, Result};
pub use executor::{RequestExecutor, RetryPolicy};
pub use intake::{RepositoryIntake, RepositorySnapshot};
pub use models::{
    Branch, BranchFilter, BuildState, BuildStatus, Commit, PullRequest, Repository,
    RepositoryProtocol, RepositoryType, SourceEntry, Team, UserRole, WebHook,
};
pub use pagination::{Page, Paginator};
pub use pool::{ConnectionPool, PoolLease, PoolSettings};
pub use request::{EndpointRequest, RequestBody};
pub use resources::ApiResources;
pub use template::UriTemplate;

#[cfg(test)]
pub use api::MockBitbucketApi;
