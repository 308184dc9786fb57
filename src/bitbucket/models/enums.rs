//! Enumerations used in requests and responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller's relationship to a repository, used to filter listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    /// Repositories the caller owns.
    Owner,
    /// Repositories the caller administers.
    Admin,
    /// Repositories the caller can write to.
    Contributor,
    /// Repositories the caller can read.
    Member,
}

impl UserRole {
    /// Value of the `role` query parameter.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Contributor => "contributor",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.id())
    }
}

/// Version control system backing a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Git.
    #[default]
    Git,
    /// Mercurial.
    #[serde(rename = "hg")]
    Mercurial,
}

/// Transport used in clone URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryProtocol {
    /// HTTPS.
    Https,
    /// SSH.
    Ssh,
}

impl RepositoryType {
    /// Builds the clone URI for `owner/repository` on bitbucket.org.
    #[must_use]
    pub fn clone_uri(self, protocol: RepositoryProtocol, owner: &str, repository: &str) -> String {
        match (self, protocol) {
            (Self::Git, RepositoryProtocol::Https) => {
                format!("https://bitbucket.org/{owner}/{repository}.git")
            }
            (Self::Git, RepositoryProtocol::Ssh) => {
                format!("git@bitbucket.org:{owner}/{repository}.git")
            }
            (Self::Mercurial, RepositoryProtocol::Https) => {
                format!("https://bitbucket.org/{owner}/{repository}")
            }
            (Self::Mercurial, RepositoryProtocol::Ssh) => {
                format!("ssh://hg@bitbucket.org/{owner}/{repository}")
            }
        }
    }
}

/// State reported in a build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildState {
    /// Build is running.
    InProgress,
    /// Build passed.
    Successful,
    /// Build failed.
    Failed,
    /// Build was stopped.
    Stopped,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{BuildState, RepositoryProtocol, RepositoryType, UserRole};

    #[rstest]
    #[case::git_https(RepositoryType::Git, RepositoryProtocol::Https, "https://bitbucket.org/o/r.git")]
    #[case::git_ssh(RepositoryType::Git, RepositoryProtocol::Ssh, "git@bitbucket.org:o/r.git")]
    #[case::hg_https(RepositoryType::Mercurial, RepositoryProtocol::Https, "https://bitbucket.org/o/r")]
    #[case::hg_ssh(RepositoryType::Mercurial, RepositoryProtocol::Ssh, "ssh://hg@bitbucket.org/o/r")]
    fn clone_uri_per_type_and_protocol(
        #[case] kind: RepositoryType,
        #[case] protocol: RepositoryProtocol,
        #[case] expected: &str,
    ) {
        assert_eq!(kind.clone_uri(protocol, "o", "r"), expected);
    }

    #[rstest]
    fn scm_names_round_trip_through_serde() {
        let hg: RepositoryType = serde_json::from_str("\"hg\"").expect("known scm");
        assert_eq!(hg, RepositoryType::Mercurial);
        assert_eq!(
            serde_json::to_string(&BuildState::InProgress).expect("serialisable"),
            "\"INPROGRESS\""
        );
    }

    #[rstest]
    fn role_display_matches_query_value() {
        assert_eq!(UserRole::Contributor.to_string(), "contributor");
    }
}
