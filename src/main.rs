//! Bitbucket Cloud CLI entrypoint for repository summaries.

use std::io::{self, Write};
use std::process::ExitCode;

use bitbucket_cloud::bitbucket::PoolSettings;
use bitbucket_cloud::{
    ApiResources, BitbucketCloudClient, BitbucketConfig, BitbucketError, RepositoryIntake,
    RepositorySnapshot,
};
use ortho_config::OrthoConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit status reported after Ctrl-C.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = if error.is_cancelled() {
                ExitCode::from(INTERRUPTED)
            } else {
                ExitCode::FAILURE
            };
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return code;
            }
            code
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), BitbucketError> {
    let config = load_config()?;
    let (owner, repo) = config.require_repository_info()?;

    let cancellation = CancellationToken::new();
    let resources = ApiResources::new(PoolSettings::default(), config.cache_settings());
    let client = BitbucketCloudClient::new(
        &resources,
        owner,
        Some(repo),
        config.client_options(cancellation.clone())?,
    )?;

    let filter = config.branch_filter();
    let intake = RepositoryIntake::new(&client);
    let snapshot = tokio::select! {
        loaded = intake.load(&filter) => loaded?,
        interrupted = tokio::signal::ctrl_c() => {
            cancellation.cancel();
            interrupted.map_err(|error| BitbucketError::Io { message: error.to_string() })?;
            return Err(BitbucketError::Cancelled);
        }
    };

    write_summary(owner, repo, &snapshot)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`BitbucketError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<BitbucketConfig, BitbucketError> {
    BitbucketConfig::load().map_err(|error| BitbucketError::Configuration {
        message: error.to_string(),
    })
}

fn write_summary(owner: &str, repo: &str, snapshot: &RepositorySnapshot) -> Result<(), BitbucketError> {
    let mut stdout = io::stdout().lock();
    let default_branch = snapshot
        .default_branch
        .as_deref()
        .unwrap_or("no main branch configured");
    let message = format!(
        "Repository {owner}/{repo}\nDefault branch: {default_branch}\nActive branches: {}\nOpen pull requests: {}",
        snapshot.branches.len(),
        snapshot.open_pull_requests().count()
    );

    writeln!(stdout, "{message}").map_err(|error| BitbucketError::Io {
        message: error.to_string(),
    })
}
