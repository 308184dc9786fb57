//! Scenario state and runtime/server initialisation for the branch listing
//! BDD tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bitbucket_cloud::bitbucket::{Branch, RetryPolicy};
use bitbucket_cloud::{
    ApiResources, BitbucketCloudClient, BitbucketError, BranchFilter, ClientOptions,
};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tokio::runtime::Runtime;
use wiremock::MockServer;

use super::harness::{OWNER, REPOSITORY};

/// Shared runtime wrapper that can be stored in rstest-bdd Slot.
#[derive(Clone)]
pub(crate) struct SharedRuntime(Rc<RefCell<Runtime>>);

impl SharedRuntime {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Self(Rc::new(RefCell::new(runtime)))
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.0.borrow().block_on(future)
    }
}

#[derive(ScenarioState, Default)]
pub(crate) struct BranchListingState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) resources: Slot<ApiResources>,
    pub(crate) branches: Slot<Vec<Branch>>,
    pub(crate) default_branch: Slot<Option<String>>,
    pub(crate) error: Slot<BitbucketError>,
}

/// Ensures the runtime and server are initialised in `BranchListingState`.
pub(crate) fn ensure_runtime_and_server(listing_state: &BranchListingState) -> SharedRuntime {
    if listing_state.runtime.with_ref(|_| ()).is_none() {
        let runtime = Runtime::new()
            .unwrap_or_else(|error| panic!("failed to create Tokio runtime: {error}"));
        listing_state.runtime.set(SharedRuntime::new(runtime));
    }

    let shared_runtime = listing_state
        .runtime
        .get()
        .unwrap_or_else(|| panic!("runtime not initialised after set"));

    if listing_state.server.with_ref(|_| ()).is_none() {
        listing_state
            .server
            .set(shared_runtime.block_on(MockServer::start()));
    }

    shared_runtime
}

fn build_client(listing_state: &BranchListingState) -> Result<BitbucketCloudClient, BitbucketError> {
    let api_base = listing_state
        .server
        .with_ref(MockServer::uri)
        .ok_or_else(|| BitbucketError::Configuration {
            message: "mock server URL missing".to_owned(),
        })?;

    if listing_state.resources.with_ref(|_| ()).is_none() {
        listing_state.resources.set(ApiResources::default());
    }
    let resources = listing_state
        .resources
        .get()
        .ok_or_else(|| BitbucketError::Configuration {
            message: "shared resources missing".to_owned(),
        })?;

    BitbucketCloudClient::new(
        &resources,
        OWNER,
        Some(REPOSITORY),
        ClientOptions {
            api_base,
            retry: RetryPolicy::new(Duration::from_millis(20), Some(5)),
            ..ClientOptions::default()
        },
    )
}

/// Lists branches through a client pointed at the mock server.
pub(crate) fn run_branch_listing(listing_state: &BranchListingState) {
    let runtime = ensure_runtime_and_server(listing_state);
    let outcome = build_client(listing_state).and_then(|client| {
        runtime.block_on(async { client.branches(&BranchFilter::default()).await })
    });

    match outcome {
        Ok(branches) => listing_state.branches.set(branches),
        Err(error) => listing_state.error.set(error),
    }
}

/// Asks a client pointed at the mock server for the main branch.
pub(crate) fn run_default_branch_lookup(listing_state: &BranchListingState) {
    let runtime = ensure_runtime_and_server(listing_state);
    let outcome = build_client(listing_state)
        .and_then(|client| runtime.block_on(async { client.default_branch().await }));

    match outcome {
        Ok(name) => listing_state.default_branch.set(name),
        Err(error) => listing_state.error.set(error),
    }
}
