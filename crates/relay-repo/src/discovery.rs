//! The discovery document: what a server holds and where each branch
//! points. Read-only, and never fails because a branch is unborn.

use std::collections::BTreeMap;

use relay_types::ObjectId;
use serde::Serialize;

use crate::error::EngineResult;
use crate::registry::RepoRegistry;
use crate::resolver::{Selectors, Target};

/// Static list of what this server can do.
pub const CAPABILITIES: &[&str] = &[
    "read",
    "write",
    "delete",
    "query",
    "listing",
    "branches",
    "validation",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeadRecord {
    pub repo: String,
    pub branch: String,
    pub head: Option<ObjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub capabilities: Vec<String>,
    pub repos: Vec<String>,
    pub branches: Vec<String>,
    pub branch_heads: BTreeMap<String, Option<ObjectId>>,
    pub selected: Target,
    /// `(repo, branch, head)` for every reported repository and branch.
    pub heads: Vec<HeadRecord>,
}

/// Every `(repo, branch, head)` triple the registry holds.
pub fn all_heads(registry: &RepoRegistry) -> EngineResult<Vec<HeadRecord>> {
    let mut out = Vec::new();
    for repo in registry.all() {
        for b in repo.branches()? {
            out.push(HeadRecord {
                repo: repo.name().to_string(),
                branch: b.name,
                head: b.head,
            });
        }
    }
    Ok(out)
}

/// Build the discovery document.
///
/// A repository selector narrows `repos` to that repository; a branch
/// selector narrows `branches`, `branchHeads` and `heads` to that branch.
/// `all` counts as no selector.
pub fn discover(
    registry: &RepoRegistry,
    selectors: &Selectors,
    selected: Target,
) -> EngineResult<Discovery> {
    let repo_filter = selectors.repo.as_ref().filter(|_| !selectors.wants_all_repos());
    let branch_filter = selectors
        .branch
        .as_deref()
        .filter(|_| !selectors.wants_all_branches());

    let repos: Vec<String> = match repo_filter {
        Some(name) => {
            registry.get(name)?;
            vec![name.clone()]
        }
        None => registry.names(),
    };

    let mut heads = Vec::new();
    for name in &repos {
        let repo = registry.get(name)?;
        for b in repo.branches()? {
            if branch_filter.is_some_and(|f| f != b.name) {
                continue;
            }
            heads.push(HeadRecord {
                repo: name.clone(),
                branch: b.name,
                head: b.head,
            });
        }
    }

    let branch_heads: BTreeMap<String, Option<ObjectId>> = heads
        .iter()
        .filter(|h| h.repo == selected.repo)
        .map(|h| (h.branch.clone(), h.head))
        .collect();

    Ok(Discovery {
        capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        repos,
        branches: branch_heads.keys().cloned().collect(),
        branch_heads,
        selected,
        heads,
    })
}
