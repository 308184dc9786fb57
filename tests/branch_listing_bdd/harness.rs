//! Shared data helpers for the branch listing BDD tests.

use serde_json::{Value, json};

use super::domain::{BranchCount, PageSize};

pub(crate) const OWNER: &str = "acme";
pub(crate) const REPOSITORY: &str = "rocket";
pub(crate) const BRANCHES_PATH: &str = "/2.0/repositories/acme/rocket/refs/branches";
pub(crate) const REPOSITORY_PATH: &str = "/2.0/repositories/acme/rocket";

/// Branch payloads named `branch-000`, `branch-001`, … where only the last
/// `active` entries are flagged active.
pub(crate) fn generate_branches(total: BranchCount, active: BranchCount) -> Vec<Value> {
    let first_active = total.value().saturating_sub(active.value());
    (0..total.value())
        .map(|index| {
            json!({
                "name": format!("branch-{index:03}"),
                "target": {"hash": format!("{index:040x}")},
                "active": index >= first_active
            })
        })
        .collect()
}

/// Splits branch payloads into `{values, next}` page envelopes.
///
/// Each page except the last links to `?page=N&pagelen=SIZE` on `server_uri`.
pub(crate) fn paginate(branches: &[Value], size: PageSize, server_uri: &str) -> Vec<Value> {
    let chunks: Vec<&[Value]> = branches.chunks(size.value()).collect();
    let last = chunks.len().saturating_sub(1);
    chunks
        .iter()
        .enumerate()
        .map(|(index, values)| {
            if index == last {
                json!({"values": values})
            } else {
                json!({
                    "values": values,
                    "next": format!(
                        "{server_uri}{BRANCHES_PATH}?page={}&pagelen={}",
                        index + 2,
                        size.value()
                    )
                })
            }
        })
        .collect()
}
