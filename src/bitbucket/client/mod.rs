//! Bitbucket Cloud repository client.
//!
//! Every operation is a URL template, a method, and an expected shape. Single
//! resources go straight through the [`RequestExecutor`]; collections go
//! through the [`Paginator`]. Team and repository lookups are served from the
//! shared caches.

use std::sync::Arc;

use http::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cache::{CacheKey, SharedCaches};
use super::classify::{Classified, decode_json};
use super::credentials::{Credential, ProxySettings};
use super::error::{BitbucketError, Result};
use super::executor::{RequestExecutor, RetryPolicy};
use super::models::{
    Branch, BranchFilter, BranchRef, BuildStatus, Commit, CommitRef, PullRequest, Repository,
    RepositoryProtocol, RepositoryType, SourceEntry, Team, UserRole, WebHook,
};
use super::pagination::{Page, Paginator};
use super::request::{EndpointRequest, RequestBody};
use super::resources::ApiResources;
use super::template::UriTemplate;

/// Public Bitbucket Cloud API host.
pub const DEFAULT_API_BASE: &str = "https://api.bitbucket.org";

const REPOSITORY_ROOT: &str = "/2.0/repositories{/owner,repo}";
const MAX_PAGE_LENGTH: u32 = 100;

/// Per-client settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Scheme and host of the API, without the `/2.0` prefix.
    pub api_base: String,
    /// HTTP Basic credential; `None` for anonymous access.
    pub credential: Option<Credential>,
    /// Upstream proxy.
    pub proxy: Option<ProxySettings>,
    /// Rate-limit retry policy.
    pub retry: RetryPolicy,
    /// Token observed between retries and pages.
    pub cancellation: CancellationToken,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            credential: None,
            proxy: None,
            retry: RetryPolicy::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MainBranchEnvelope {
    #[serde(default)]
    mainbranch: Option<BranchRef>,
}

/// Client for one owner, and optionally one repository, on Bitbucket Cloud.
#[derive(Debug)]
pub struct BitbucketCloudClient {
    owner: String,
    repository: Option<String>,
    api_base: String,
    executor: RequestExecutor,
    caches: Arc<SharedCaches>,
    repository_details: OnceCell<Repository>,
    default_branch: OnceCell<String>,
}

impl BitbucketCloudClient {
    /// Creates a client that borrows the shared pool and caches.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Configuration`] when the owner is blank or
    /// the HTTP client cannot be built for the proxy.
    pub fn new(
        resources: &ApiResources,
        owner: &str,
        repository: Option<&str>,
        options: ClientOptions,
    ) -> Result<Self> {
        let trimmed_owner = owner.trim();
        if trimmed_owner.is_empty() {
            return Err(BitbucketError::Configuration {
                message: "repository owner must not be empty".to_owned(),
            });
        }

        let executor = RequestExecutor::new(
            Arc::clone(resources.pool()),
            options.proxy.as_ref(),
            options.credential,
            options.retry,
            options.cancellation,
        )?;

        Ok(Self {
            owner: trimmed_owner.to_owned(),
            repository: repository
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
            api_base: options.api_base.trim_end_matches('/').to_owned(),
            executor,
            caches: Arc::clone(resources.caches()),
            repository_details: OnceCell::new(),
            default_branch: OnceCell::new(),
        })
    }

    /// Repository owner (user or team).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository slug, when the client is bound to one repository.
    #[must_use]
    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// Authenticated username, or `None` for anonymous clients.
    #[must_use]
    pub fn login(&self) -> Option<&str> {
        self.executor.credential().map(Credential::username)
    }

    /// Clone URI for a repository.
    #[must_use]
    pub fn repository_uri(
        kind: RepositoryType,
        protocol: RepositoryProtocol,
        owner: &str,
        repository: &str,
    ) -> String {
        kind.clone_uri(protocol, owner, repository)
    }

    /// Lists every pull request of the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or decoded.
    pub async fn pull_requests(&self) -> Result<Vec<PullRequest>> {
        let template = self
            .repository_template("/pullrequests{?pagelen}")?
            .set("pagelen", MAX_PAGE_LENGTH);
        self.paginator()
            .collect(self.request(Method::GET, &template)?)
            .await
    }

    /// Fetches one pull request.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::NotFound`] when the pull request does not
    /// exist.
    pub async fn pull_request(&self, id: u64) -> Result<PullRequest> {
        let template = self
            .repository_template("/pullrequests{/id}")?
            .set("id", id);
        self.get_json(&template).await
    }

    /// Resolves the full head commit hash of a pull request.
    ///
    /// The commit embedded in a pull request is abbreviated, so the first
    /// entry of its commit list is fetched instead.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidResponse`] when the pull request has
    /// no commits.
    pub async fn resolve_source_full_hash(&self, pull_request: &PullRequest) -> Result<String> {
        let template = self
            .repository_template("/pullrequests{/id}/commits{?fields,pagelen}")?
            .set("id", pull_request.id)
            .set("fields", "values.hash")
            .set("pagelen", 1);
        let page: Page<CommitRef> = self.get_json(&template).await?;
        page.values
            .into_iter()
            .next()
            .map(|commit| commit.hash)
            .ok_or_else(|| BitbucketError::InvalidResponse {
                message: format!(
                    "no source commits for pull request {} in {}",
                    pull_request.id,
                    self.display_name()
                ),
            })
    }

    /// Fetches the repository, memoised for the life of this client.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::NotFound`] when the repository does not
    /// exist.
    pub async fn repository(&self) -> Result<Repository> {
        self.repository_details
            .get_or_try_init(|| async move {
                let template = self.repository_template("")?;
                self.get_json(&template).await
            })
            .await
            .cloned()
    }

    /// Whether the repository is private.
    ///
    /// # Errors
    ///
    /// Same as [`Self::repository`].
    pub async fn is_private(&self) -> Result<bool> {
        Ok(self.repository().await?.is_private)
    }

    /// Name of the main branch, or `None` when none is configured.
    ///
    /// A found name is memoised for the life of this client.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than 404.
    pub async fn default_branch(&self) -> Result<Option<String>> {
        if let Some(known) = self.default_branch.get() {
            return Ok(Some(known.clone()));
        }

        let template = self
            .repository_template("{?fields}")?
            .set("fields", "mainbranch.name");
        let envelope: Option<MainBranchEnvelope> = self.get_optional_json(&template).await?;
        let Some(name) = envelope
            .and_then(|found| found.mainbranch)
            .map(|branch| branch.name)
        else {
            debug!(repository = %self.display_name(), "no main branch configured");
            return Ok(None);
        };

        if let Err(error) = self.default_branch.set(name.clone()) {
            debug!(%error, "default branch already memoised");
        }
        Ok(Some(name))
    }

    /// Lists active branches, restricted to `filter` when it names any.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or decoded.
    pub async fn branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>> {
        let template = self
            .repository_template("/refs/branches{?pagelen,q}")?
            .set("pagelen", MAX_PAGE_LENGTH)
            .set_optional("q", filter.query());
        self.paginator()
            .collect_where(self.request(Method::GET, &template)?, |branch: &Branch| {
                branch.active
            })
            .await
    }

    /// Looks up a commit, returning `None` when the hash is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than 404.
    pub async fn resolve_commit(&self, hash: &str) -> Result<Option<Commit>> {
        let template = self.repository_template("/commit{/hash}")?.set("hash", hash);
        self.get_optional_json(&template).await
    }

    /// Adds a comment to a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if Bitbucket rejects the comment.
    pub async fn post_commit_comment(&self, hash: &str, comment: &str) -> Result<()> {
        let template = self
            .repository_template("/commit{/hash}/comments")?
            .set("hash", hash);
        let request = self
            .request(Method::POST, &template)?
            .with_body(RequestBody::Form(vec![(
                "content".to_owned(),
                comment.to_owned(),
            )]));
        self.send(&request).await
    }

    /// Whether `path` exists at `reference`; any status other than 200 reads
    /// as absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be sent or is cancelled.
    pub async fn check_path_exists(&self, reference: &str, path: &str) -> Result<bool> {
        let template = self.source_template(reference, path)?;
        let response = self
            .executor
            .execute(&self.request(Method::HEAD, &template)?)
            .await?;
        let status = response.status();
        drop(response);
        Ok(status == http::StatusCode::OK)
    }

    /// Lists a directory at `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or decoded.
    pub async fn directory_content(&self, reference: &str, path: &str) -> Result<Vec<SourceEntry>> {
        let template = self.source_template(reference, path)?;
        self.paginator()
            .collect(self.request(Method::GET, &template)?)
            .await
    }

    /// Reads a file at `reference` as text.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::NotFound`] when the file does not exist and
    /// [`BitbucketError::Decode`] when it is not UTF-8.
    pub async fn file_content(&self, reference: &str, path: &str) -> Result<String> {
        let template = self.source_template(reference, path)?;
        let request = self.request(Method::GET, &template)?;
        let body = self.executor.fetch(&request).await?.into_body()?;
        String::from_utf8(body).map_err(|error| BitbucketError::decode(request.url().as_str(), &error))
    }

    /// Registers a web hook on the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if Bitbucket rejects the hook.
    pub async fn register_commit_web_hook(&self, hook: &WebHook) -> Result<()> {
        let template = self.repository_template("/hooks")?;
        let request = self
            .request(Method::POST, &template)?
            .with_body(RequestBody::json(hook)?);
        self.send(&request).await
    }

    /// Replaces an existing web hook.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when the hook has no UUID.
    pub async fn update_commit_web_hook(&self, hook: &WebHook) -> Result<()> {
        let template = self.hook_template(hook)?;
        let request = self
            .request(Method::PUT, &template)?
            .with_body(RequestBody::json(hook)?);
        self.send(&request).await
    }

    /// Deletes a web hook. Only `204 No Content` counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when the hook has no UUID
    /// and [`BitbucketError::Request`] for any other status.
    pub async fn remove_commit_web_hook(&self, hook: &WebHook) -> Result<()> {
        let template = self.hook_template(hook)?;
        let request = self.request(Method::DELETE, &template)?;
        match self.executor.fetch(&request).await? {
            Classified::NoContent => Ok(()),
            Classified::NotFound { url } => Err(BitbucketError::NotFound { url }),
            Classified::Success { status, body } => Err(BitbucketError::Request {
                url: request.url().to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_owned(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    /// Lists the repository's web hooks.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or decoded.
    pub async fn web_hooks(&self) -> Result<Vec<WebHook>> {
        let template = self
            .repository_template("/hooks{?pagelen}")?
            .set("pagelen", MAX_PAGE_LENGTH);
        self.paginator()
            .collect(self.request(Method::GET, &template)?)
            .await
    }

    /// Reports a build status on a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if Bitbucket rejects the status.
    pub async fn post_build_status(&self, status: &BuildStatus) -> Result<()> {
        let template = self
            .repository_template("/commit{/hash}/statuses/build")?
            .set("hash", &status.hash);
        let request = self
            .request(Method::POST, &template)?
            .with_body(RequestBody::json(status)?);
        self.send(&request).await
    }

    /// Looks up the owner as a team, returning `None` when it is a user.
    ///
    /// Results, including `None`, are cached per API base, owner and login.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than 404. Failures are not cached.
    pub async fn team(&self) -> Result<Option<Team>> {
        let key = CacheKey::team(&self.api_base, &self.owner, self.login());
        self.caches
            .teams()
            .get_or_try_insert_with(key, async {
                let template = UriTemplate::new("/2.0/teams{/owner}").set("owner", &self.owner);
                self.get_optional_json(&template).await
            })
            .await
    }

    /// Lists the owner's repositories sorted by name.
    ///
    /// `role` only applies to authenticated clients. Results are cached per
    /// API base, owner, login and applied role.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or decoded.
    pub async fn repositories(&self, role: Option<UserRole>) -> Result<Vec<Repository>> {
        let login = self.login();
        let applied_role = login.and(role);
        let key = CacheKey::repositories(&self.api_base, &self.owner, login, applied_role);
        self.caches
            .repositories()
            .get_or_try_insert_with(key, async {
                let template = UriTemplate::new("/2.0/repositories{/owner}{?role,pagelen}")
                    .set("owner", &self.owner)
                    .set_optional("role", applied_role)
                    .set("pagelen", MAX_PAGE_LENGTH);
                let mut listed: Vec<Repository> = self
                    .paginator()
                    .collect(self.request(Method::GET, &template)?)
                    .await?;
                listed.sort_by(|left, right| left.repository_name().cmp(right.repository_name()));
                Ok(listed)
            })
            .await
    }

    fn display_name(&self) -> String {
        match &self.repository {
            Some(repository) => format!("{}/{repository}", self.owner),
            None => self.owner.clone(),
        }
    }

    fn repository_template(&self, suffix: &str) -> Result<UriTemplate> {
        let repository = self
            .repository
            .as_deref()
            .ok_or_else(|| BitbucketError::InvalidRequest {
                message: format!("no repository configured for owner {}", self.owner),
            })?;
        Ok(UriTemplate::new(format!("{REPOSITORY_ROOT}{suffix}"))
            .set("owner", &self.owner)
            .set("repo", repository))
    }

    fn source_template(&self, reference: &str, path: &str) -> Result<UriTemplate> {
        Ok(self
            .repository_template("/src{/ref}/{+path}")?
            .set("ref", reference)
            .set("path", path.trim_start_matches('/')))
    }

    fn hook_template(&self, hook: &WebHook) -> Result<UriTemplate> {
        let uuid = hook
            .registered_uuid()
            .ok_or_else(|| BitbucketError::InvalidRequest {
                message: format!("web hook for {} has no UUID", hook.url),
            })?;
        Ok(self.repository_template("/hooks{/uuid}")?.set("uuid", uuid))
    }

    fn request(&self, method: Method, template: &UriTemplate) -> Result<EndpointRequest> {
        EndpointRequest::from_template(method, &self.api_base, template)
    }

    const fn paginator(&self) -> Paginator<'_> {
        Paginator::new(&self.executor)
    }

    async fn send(&self, request: &EndpointRequest) -> Result<()> {
        self.executor.fetch(request).await?.into_body()?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, template: &UriTemplate) -> Result<T> {
        let request = self.request(Method::GET, template)?;
        let body = self.executor.fetch(&request).await?.into_body()?;
        decode_json(request.url().as_str(), &body)
    }

    async fn get_optional_json<T: DeserializeOwned>(
        &self,
        template: &UriTemplate,
    ) -> Result<Option<T>> {
        let request = self.request(Method::GET, template)?;
        match self.executor.fetch(&request).await?.into_optional_body() {
            Some(body) => decode_json(request.url().as_str(), &body).map(Some),
            None => Ok(None),
        }
    }
}
