//! Unit tests for configuration loading and precedence.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::{MergeComposer, OrthoConfig};
use rstest::rstest;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::BitbucketConfig;
use crate::bitbucket::error::BitbucketError;

/// Applies a configuration layer to the composer based on the layer type.
fn apply_layer(composer: &mut MergeComposer, layer_type: &str, value: Value) {
    match layer_type {
        "defaults" => composer.push_defaults(value),
        "file" => composer.push_file(value, None),
        "environment" => composer.push_environment(value),
        "cli" => composer.push_cli(value),
        _ => panic!("unknown layer type: {layer_type}"),
    }
}

fn build_config_from_layers(layers: Vec<(&str, Value)>) -> BitbucketConfig {
    let mut composer = MergeComposer::new();
    for (layer_type, value) in layers {
        apply_layer(&mut composer, layer_type, value);
    }
    BitbucketConfig::merge_from_layers(composer.layers()).expect("merge should succeed")
}

#[rstest]
#[case::file_overrides_defaults(
    vec![("defaults", json!({"owner": "default-owner"})), ("file", json!({"owner": "file-owner"}))],
    "file-owner",
    "file should override default"
)]
#[case::environment_overrides_file(
    vec![("file", json!({"owner": "file-owner"})), ("environment", json!({"owner": "env-owner"}))],
    "env-owner",
    "environment should override file"
)]
#[case::cli_overrides_environment(
    vec![("environment", json!({"owner": "env-owner"})), ("cli", json!({"owner": "cli-owner"}))],
    "cli-owner",
    "CLI should override environment"
)]
fn test_layer_precedence(
    #[case] layers: Vec<(&str, Value)>,
    #[case] expected: &str,
    #[case] message: &str,
) {
    let config = build_config_from_layers(layers);

    assert_eq!(config.owner.as_deref(), Some(expected), "{message}");
}

#[rstest]
fn partial_overrides_preserve_lower_values() {
    let config = build_config_from_layers(vec![
        (
            "file",
            json!({"owner": "acme", "repo": "rocket", "rate_limit_delay_ms": 250}),
        ),
        ("cli", json!({"repo": "shuttle"})),
    ]);

    assert_eq!(config.owner.as_deref(), Some("acme"));
    assert_eq!(config.repo.as_deref(), Some("shuttle"));
    assert_eq!(config.retry_policy().delay(), Duration::from_millis(250));
}

#[rstest]
fn defaults_match_client_defaults() {
    let config = BitbucketConfig::default();

    assert_eq!(config.retry_policy().delay(), Duration::from_secs(5));
    assert_eq!(config.retry_policy().max_retries(), None);
    assert_eq!(
        config.cache_settings().team_ttl,
        Duration::from_secs(21_600)
    );
    assert_eq!(
        config.cache_settings().repository_ttl,
        Duration::from_secs(10_800)
    );
    assert_eq!(config.api_base(), "https://api.bitbucket.org");
    assert!(config.branch_filter().is_empty());
}

#[rstest]
#[case::missing_owner(None, Some("rocket"), "owner")]
#[case::missing_repo(Some("acme"), None, "name")]
#[case::blank_repo(Some("acme"), Some("  "), "name")]
fn require_repository_info_reports_missing_part(
    #[case] owner: Option<&str>,
    #[case] repo: Option<&str>,
    #[case] mentioned: &str,
) {
    let config = BitbucketConfig {
        owner: owner.map(str::to_owned),
        repo: repo.map(str::to_owned),
        ..Default::default()
    };

    match config.require_repository_info() {
        Err(BitbucketError::Configuration { message }) => {
            assert!(message.contains(mentioned), "{message}");
        }
        other => panic!("expected Configuration error, got {other:?}"),
    }
}

#[rstest]
#[case::neither(None, None, true, false)]
#[case::both(Some("alice"), Some("secret"), true, true)]
#[case::only_username(Some("alice"), None, false, false)]
#[case::only_password(None, Some("secret"), false, false)]
fn credential_needs_both_or_neither(
    #[case] username: Option<&str>,
    #[case] password: Option<&str>,
    #[case] resolves: bool,
    #[case] authenticated: bool,
) {
    let config = BitbucketConfig {
        username: username.map(str::to_owned),
        password: password.map(str::to_owned),
        ..Default::default()
    };

    let result = config.resolve_credential();

    assert_eq!(result.is_ok(), resolves, "{result:?}");
    if let Ok(credential) = result {
        assert_eq!(credential.is_some(), authenticated);
    }
}

#[rstest]
fn proxy_resolution_validates_credentials() {
    let unauthenticated = BitbucketConfig {
        proxy_url: Some("http://proxy.local:3128".to_owned()),
        ..Default::default()
    };
    let half_configured = BitbucketConfig {
        proxy_url: Some("http://proxy.local:3128".to_owned()),
        proxy_username: Some("bob".to_owned()),
        ..Default::default()
    };

    let proxy = unauthenticated
        .resolve_proxy()
        .expect("proxy should resolve")
        .expect("proxy configured");
    assert!(proxy.credential().is_none());
    assert!(matches!(
        half_configured.resolve_proxy(),
        Err(BitbucketError::Configuration { .. })
    ));
    assert!(
        BitbucketConfig::default()
            .resolve_proxy()
            .expect("no proxy is fine")
            .is_none()
    );
}

#[rstest]
fn client_options_carry_resolved_settings() {
    let config = BitbucketConfig {
        username: Some("alice".to_owned()),
        password: Some("secret".to_owned()),
        api_base: Some("http://127.0.0.1:9000".to_owned()),
        rate_limit_max_retries: Some(3),
        branch_filter: Some("main, develop".to_owned()),
        ..Default::default()
    };

    let options = config
        .client_options(CancellationToken::new())
        .expect("options should resolve");

    assert_eq!(options.api_base, "http://127.0.0.1:9000");
    assert_eq!(
        options.credential.as_ref().map(|credential| credential.username()),
        Some("alice")
    );
    assert_eq!(options.retry.max_retries(), Some(3));
    assert_eq!(config.branch_filter().names(), ["main", "develop"]);
}

#[rstest]
fn loads_from_environment_and_cli() {
    let _guard = env_lock::lock_env([
        ("BITBUCKET_OWNER", Some("env-owner")),
        ("BITBUCKET_RATE_LIMIT_DELAY_MS", Some("750")),
        ("HOME", Some("/nonexistent/bitbucket-cloud-home")),
        ("XDG_CONFIG_HOME", Some("/nonexistent/bitbucket-cloud-home")),
    ]);

    let args = ["bitbucket-cloud", "--repo", "rocket", "-o", "cli-owner"].map(OsString::from);
    let config = BitbucketConfig::load_from_iter(args).expect("config should load");

    assert_eq!(config.owner.as_deref(), Some("cli-owner"));
    assert_eq!(config.repo.as_deref(), Some("rocket"));
    assert_eq!(config.rate_limit_delay_ms, 750);
}
