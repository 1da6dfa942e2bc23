//! The set of repositories a server exposes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use walkdir::WalkDir;

use crate::error::{EngineError, EngineResult};
use crate::repository::{validate_repo_name, Repository};

#[derive(Debug)]
pub struct RepoRegistry {
    repos: RwLock<BTreeMap<String, Arc<Repository>>>,
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(BTreeMap::new()),
        }
    }

    /// Discover repositories under `root`.
    ///
    /// Every immediate subdirectory with a repository layout is registered
    /// under its directory name. If `root` is itself a repository it is
    /// registered as `default_repo`. Directories that fail to open are
    /// skipped with a warning.
    pub fn scan(root: &Path, default_repo: &str) -> EngineResult<Self> {
        let registry = Self::new();
        if Repository::looks_like_repo(root) {
            registry.insert(Repository::open(default_repo, root)?);
        }
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
        {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if validate_repo_name(name).is_err() || !Repository::looks_like_repo(entry.path()) {
                continue;
            }
            if registry.contains(name) {
                tracing::warn!(repo = name, "skipping directory shadowed by the root repository");
                continue;
            }
            match Repository::open(name, entry.path()) {
                Ok(repo) => registry.insert(repo),
                Err(e) => tracing::warn!(repo = name, error = %e, "skipping unreadable repository"),
            }
        }
        tracing::debug!(root = %root.display(), repos = ?registry.names(), "scanned repositories");
        Ok(registry)
    }

    pub fn insert(&self, repo: Repository) {
        let mut repos = self.repos.write().expect("lock poisoned");
        repos.insert(repo.name().to_string(), Arc::new(repo));
    }

    pub fn get(&self, name: &str) -> EngineResult<Arc<Repository>> {
        self.repos
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::RepoNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.repos.read().expect("lock poisoned").contains_key(name)
    }

    /// Sorted repository names.
    pub fn names(&self) -> Vec<String> {
        self.repos.read().expect("lock poisoned").keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Arc<Repository>> {
        self.repos.read().expect("lock poisoned").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.repos.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RepoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init("films", &dir.path().join("films"), "main").unwrap();
        Repository::init("books", &dir.path().join("books"), "main").unwrap();
        std::fs::create_dir(dir.path().join("not-a-repo")).unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();

        let registry = RepoRegistry::scan(dir.path(), "default").unwrap();
        assert_eq!(registry.names(), ["books", "films"]);
        assert!(matches!(
            registry.get("not-a-repo").unwrap_err(),
            EngineError::RepoNotFound(_)
        ));
    }

    #[test]
    fn root_repository_is_default() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init("default", dir.path(), "main").unwrap();
        let registry = RepoRegistry::scan(dir.path(), "default").unwrap();
        assert_eq!(registry.names(), ["default"]);
        assert!(registry.get("default").unwrap().location().is_some());
    }

    #[test]
    fn insert_and_lookup() {
        let registry = RepoRegistry::new();
        assert!(registry.is_empty());
        registry.insert(Repository::in_memory("mem"));
        assert_eq!(registry.get("mem").unwrap().name(), "mem");
        assert_eq!(registry.len(), 1);
    }
}
