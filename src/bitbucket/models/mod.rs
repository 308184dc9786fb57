//! Resource shapes returned by, and sent to, the Bitbucket Cloud 2.0 API.
//!
//! Only the fields the client reads are modelled; unknown fields are
//! ignored on decode.

mod enums;
mod filter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use enums::{BuildState, RepositoryProtocol, RepositoryType, UserRole};
pub use filter::BranchFilter;

/// A user or team account as embedded in other resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Account {
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Account UUID including braces.
    #[serde(default)]
    pub uuid: Option<String>,
}

/// Reference to a branch by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,
}

/// Reference to a commit by hash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitRef {
    /// Full or abbreviated commit hash.
    pub hash: String,
    /// Commit timestamp, when provided.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Reference to a repository by full name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    /// `owner/slug`.
    pub full_name: String,
}

/// One side of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullRequestEndpoint {
    /// Branch on this side.
    #[serde(default)]
    pub branch: Option<BranchRef>,
    /// Commit on this side (often abbreviated).
    #[serde(default)]
    pub commit: Option<CommitRef>,
    /// Repository on this side, which differs for forks.
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub id: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// `OPEN`, `MERGED`, `DECLINED` or `SUPERSEDED`.
    #[serde(default)]
    pub state: Option<String>,
    /// Author account.
    #[serde(default)]
    pub author: Option<Account>,
    /// Source side.
    #[serde(default)]
    pub source: PullRequestEndpoint,
    /// Destination side.
    #[serde(default)]
    pub destination: PullRequestEndpoint,
}

impl PullRequest {
    /// Source branch name, if present.
    #[must_use]
    pub fn source_branch(&self) -> Option<&str> {
        self.source.branch.as_ref().map(|branch| branch.name.as_str())
    }

    /// Destination branch name, if present.
    #[must_use]
    pub fn destination_branch(&self) -> Option<&str> {
        self.destination
            .branch
            .as_ref()
            .map(|branch| branch.name.as_str())
    }
}

const fn active_by_default() -> bool {
    true
}

/// A branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Head commit.
    #[serde(default)]
    pub target: Option<CommitRef>,
    /// Whether the branch is still active; absent means active.
    #[serde(default = "active_by_default")]
    pub active: bool,
}

impl Branch {
    /// Head commit hash, if present.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.hash.as_str())
    }
}

/// Commit author as recorded by the SCM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommitAuthor {
    /// Raw `Name <email>` string.
    #[serde(default)]
    pub raw: Option<String>,
}

/// A commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Commit message.
    #[serde(default)]
    pub message: Option<String>,
    /// Commit timestamp.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Author.
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

/// A repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// `owner/slug`.
    pub full_name: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub is_private: bool,
    /// SCM type.
    #[serde(default)]
    pub scm: RepositoryType,
    /// Main branch, when configured.
    #[serde(default)]
    pub mainbranch: Option<BranchRef>,
    /// Owning account.
    #[serde(default)]
    pub owner: Option<Account>,
}

impl Repository {
    /// Slug part of the full name.
    #[must_use]
    pub fn repository_name(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or(self.full_name.as_str(), |(_, slug)| slug)
    }

    /// Owner part of the full name.
    #[must_use]
    pub fn owner_name(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or(self.full_name.as_str(), |(owner, _)| owner)
    }
}

/// A team account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Team {
    /// Team handle.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Team UUID including braces.
    #[serde(default)]
    pub uuid: Option<String>,
}

/// A repository web hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHook {
    /// Hook UUID; absent before registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Callback URL.
    pub url: String,
    /// Whether the hook fires.
    #[serde(default)]
    pub active: bool,
    /// Subscribed event keys, such as `repo:push`.
    #[serde(default)]
    pub events: Vec<String>,
}

impl WebHook {
    /// UUID when present and not blank.
    #[must_use]
    pub fn registered_uuid(&self) -> Option<&str> {
        self.uuid.as_deref().filter(|uuid| !uuid.trim().is_empty())
    }
}

/// A commit build status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStatus {
    /// Commit the status applies to; part of the URL, not the payload.
    #[serde(skip)]
    pub hash: String,
    /// Build state.
    pub state: BuildState,
    /// Unique key for the build within the commit.
    pub key: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Link to the build.
    pub url: String,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An entry of a source directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// `commit_file` or `commit_directory`.
    #[serde(rename = "type")]
    pub kind: String,
    /// File size in bytes, for files.
    #[serde(default)]
    pub size: Option<u64>,
}

impl SourceEntry {
    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == "commit_directory"
    }
}
