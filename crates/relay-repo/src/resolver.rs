//! Turning request selectors into a concrete repository and branch.

use relay_refs::{validate_branch_name, ALL_SCOPE};
use serde::Serialize;

/// Repository and branch selectors as they arrive on a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selectors {
    pub repo: Option<String>,
    pub branch: Option<String>,
}

impl Selectors {
    pub fn new(repo: Option<&str>, branch: Option<&str>) -> Self {
        Self {
            repo: non_empty(repo),
            branch: non_empty(branch),
        }
    }

    /// Combine header and query-parameter selectors; headers win.
    pub fn from_sources(
        header_repo: Option<&str>,
        query_repo: Option<&str>,
        header_branch: Option<&str>,
        query_branch: Option<&str>,
    ) -> Self {
        Self {
            repo: non_empty(header_repo).or_else(|| non_empty(query_repo)),
            branch: non_empty(header_branch).or_else(|| non_empty(query_branch)),
        }
    }

    pub fn branch(branch: &str) -> Self {
        Self::new(None, Some(branch))
    }

    pub fn wants_all_repos(&self) -> bool {
        self.repo.as_deref() == Some(ALL_SCOPE)
    }

    pub fn wants_all_branches(&self) -> bool {
        self.branch.as_deref() == Some(ALL_SCOPE)
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// A resolved `(repository, branch)` pair. The branch may not exist yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Target {
    pub repo: String,
    pub branch: String,
}

/// Defaults applied when a selector is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defaults {
    pub repo: String,
    pub branch: String,
}

impl Defaults {
    /// Resolve selectors to a single target. `all` is not a single target
    /// and is rejected by name validation.
    pub fn target(&self, selectors: &Selectors) -> Result<Target, String> {
        let repo = selectors.repo.clone().unwrap_or_else(|| self.repo.clone());
        let branch = selectors.branch.clone().unwrap_or_else(|| self.branch.clone());
        validate_branch_name(&branch).map_err(|e| e.to_string())?;
        Ok(Target { repo, branch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Defaults {
        Defaults {
            repo: "default".into(),
            branch: "main".into(),
        }
    }

    #[test]
    fn header_beats_query() {
        let s = Selectors::from_sources(Some("films"), Some("books"), None, Some("draft"));
        assert_eq!(s.repo.as_deref(), Some("films"));
        assert_eq!(s.branch.as_deref(), Some("draft"));

        let s = Selectors::from_sources(Some("  "), Some("books"), Some(""), None);
        assert_eq!(s.repo.as_deref(), Some("books"));
        assert_eq!(s.branch, None);
    }

    #[test]
    fn defaults_fill_gaps() {
        let t = defaults().target(&Selectors::default()).unwrap();
        assert_eq!(
            t,
            Target {
                repo: "default".into(),
                branch: "main".into()
            }
        );
        let t = defaults().target(&Selectors::branch("draft")).unwrap();
        assert_eq!(t.branch, "draft");
    }

    #[test]
    fn all_is_not_a_target() {
        let s = Selectors::branch("all");
        assert!(s.wants_all_branches());
        assert!(defaults().target(&s).is_err());
        assert!(defaults().target(&Selectors::branch("a..b")).is_err());
    }
}
