//! Support modules for the branch listing BDD tests.

pub(crate) mod domain;
pub(crate) mod harness;
pub(crate) mod state;

pub(crate) use domain::{BranchCount, PageSize, RequestCount};
pub(crate) use harness::{BRANCHES_PATH, REPOSITORY_PATH, generate_branches, paginate};
pub(crate) use state::{
    BranchListingState, ensure_runtime_and_server, run_branch_listing, run_default_branch_lookup,
};
