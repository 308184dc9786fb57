//! High-level repository intake facade.
//!
//! Loads the default branch, the active branches and the pull requests of a
//! repository in one call, for callers that want a summary rather than
//! individual endpoints.

use super::api::BitbucketApi;
use super::error::Result;
use super::models::{Branch, BranchFilter, PullRequest};

/// Summary of a repository at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    /// Main branch, if configured.
    pub default_branch: Option<String>,
    /// Active branches in listing order.
    pub branches: Vec<Branch>,
    /// Pull requests in listing order.
    pub pull_requests: Vec<PullRequest>,
}

impl RepositorySnapshot {
    /// Pull requests whose state is `OPEN`.
    pub fn open_pull_requests(&self) -> impl Iterator<Item = &PullRequest> {
        self.pull_requests
            .iter()
            .filter(|pull| pull.state.as_deref() == Some("OPEN"))
    }

    /// Whether the main branch appears among the listed branches.
    #[must_use]
    pub fn default_branch_listed(&self) -> bool {
        self.default_branch.as_deref().is_some_and(|name| {
            self.branches.iter().any(|branch| branch.name == name)
        })
    }
}

/// Aggregates repository reads through a [`BitbucketApi`].
///
/// # Example
///
/// ```ignore
/// use bitbucket_cloud::bitbucket::{ApiResources, BitbucketCloudClient, ClientOptions};
/// use bitbucket_cloud::bitbucket::{BranchFilter, RepositoryIntake};
///
/// let resources = ApiResources::default();
/// let client = BitbucketCloudClient::new(&resources, "acme", Some("rocket"), ClientOptions::default())?;
/// let snapshot = RepositoryIntake::new(&client).load(&BranchFilter::default()).await?;
/// ```
pub struct RepositoryIntake<'client, Api>
where
    Api: BitbucketApi,
{
    client: &'client Api,
}

impl<'client, Api> RepositoryIntake<'client, Api>
where
    Api: BitbucketApi,
{
    /// Create a new repository intake facade.
    #[must_use]
    pub const fn new(client: &'client Api) -> Self {
        Self { client }
    }

    /// Loads the repository summary, issuing the three reads concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the reads.
    pub async fn load(&self, filter: &BranchFilter) -> Result<RepositorySnapshot> {
        let (default_branch, branches, pull_requests) = tokio::try_join!(
            self.client.default_branch(),
            self.client.branches(filter),
            self.client.pull_requests(),
        )?;

        Ok(RepositorySnapshot {
            default_branch,
            branches,
            pull_requests,
        })
    }
}
