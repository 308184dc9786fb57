//! Trait seam over the read operations used by repository intake.

use async_trait::async_trait;

use super::client::BitbucketCloudClient;
use super::error::Result;
use super::models::{Branch, BranchFilter, PullRequest};

/// Read access to one Bitbucket repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BitbucketApi: Send + Sync {
    /// Name of the main branch, if one is configured.
    async fn default_branch(&self) -> Result<Option<String>>;

    /// Active branches, optionally restricted by name.
    async fn branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>>;

    /// Every pull request of the repository.
    async fn pull_requests(&self) -> Result<Vec<PullRequest>>;
}

#[async_trait]
impl BitbucketApi for BitbucketCloudClient {
    async fn default_branch(&self) -> Result<Option<String>> {
        Self::default_branch(self).await
    }

    async fn branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>> {
        Self::branches(self, filter).await
    }

    async fn pull_requests(&self) -> Result<Vec<PullRequest>> {
        Self::pull_requests(self).await
    }
}
