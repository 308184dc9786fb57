//! Bitbucket Cloud REST client library.
//!
//! The library executes authenticated requests through a shared, bounded
//! connection pool, absorbs rate limiting, follows cursor pagination, and
//! caches team and repository lookups. Absence is reported as `None` rather
//! than as an error so callers can tell "nothing there" from a failure.

pub mod bitbucket;
pub mod config;

pub use bitbucket::{
    ApiResources, BitbucketApi, BitbucketCloudClient, BitbucketError, BranchFilter, ClientOptions,
    RepositoryIntake, RepositorySnapshot,
};
pub use config::BitbucketConfig;
