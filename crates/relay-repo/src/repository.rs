//! A repository: one object store plus its branch refs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use relay_refs::{BranchHead, FileRefStore, InMemoryRefStore, RefError, RefStore};
use relay_store::{FileObjectStore, InMemoryObjectStore, ObjectStore};
use relay_types::ObjectId;

use crate::error::{EngineError, EngineResult};

const OBJECTS_DIR: &str = "objects";
const HEADS_DIR: &str = "refs/heads";

/// A named, independently versioned store.
pub struct Repository {
    name: String,
    location: Option<PathBuf>,
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
    ) -> Self {
        Self {
            name: name.into(),
            location: None,
            objects,
            refs,
        }
    }

    /// A repository held entirely in memory.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// `true` if `dir` has the on-disk layout of a repository.
    pub fn looks_like_repo(dir: &Path) -> bool {
        dir.join(OBJECTS_DIR).is_dir() && dir.join(HEADS_DIR).is_dir()
    }

    /// Open an existing on-disk repository.
    pub fn open(name: impl Into<String>, dir: &Path) -> EngineResult<Self> {
        let name = name.into();
        if !Self::looks_like_repo(dir) {
            return Err(EngineError::RepoNotFound(name));
        }
        let objects = FileObjectStore::open(dir.join(OBJECTS_DIR))?;
        let refs = FileRefStore::open(dir.join(HEADS_DIR))?;
        Ok(Self {
            name,
            location: Some(dir.to_path_buf()),
            objects: Arc::new(objects),
            refs: Arc::new(refs),
        })
    }

    /// Create the on-disk layout at `dir` with an unborn `default_branch`.
    pub fn init(name: impl Into<String>, dir: &Path, default_branch: &str) -> EngineResult<Self> {
        let name = name.into();
        validate_repo_name(&name)?;
        if Self::looks_like_repo(dir) {
            return Err(EngineError::RepoExists(name));
        }
        let objects = FileObjectStore::open(dir.join(OBJECTS_DIR))?;
        let refs = FileRefStore::open(dir.join(HEADS_DIR))?;
        refs.create_branch(default_branch, None)?;
        tracing::info!(repo = %name, dir = %dir.display(), branch = default_branch, "initialized repository");
        Ok(Self {
            name,
            location: Some(dir.to_path_buf()),
            objects: Arc::new(objects),
            refs: Arc::new(refs),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk directory, `None` for in-memory repositories.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    pub fn branch(&self, branch: &str) -> EngineResult<BranchHead> {
        self.refs
            .read_branch(branch)?
            .ok_or_else(|| EngineError::BranchNotFound {
                repo: self.name.clone(),
                branch: branch.to_string(),
            })
    }

    pub fn head(&self, branch: &str) -> EngineResult<Option<ObjectId>> {
        Ok(self.branch(branch)?.head)
    }

    pub fn branches(&self) -> EngineResult<Vec<BranchHead>> {
        Ok(self.refs.list_branches()?)
    }

    /// Create `branch` unborn, tolerating a concurrent creator.
    pub fn ensure_branch(&self, branch: &str) -> EngineResult<()> {
        match self.refs.create_branch(branch, None) {
            Ok(()) | Err(RefError::AlreadyExists { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Repository names are single path components: ASCII letters, digits,
/// `-`, `_` and `.`, not starting with `.`, and never `all`.
pub fn validate_repo_name(name: &str) -> EngineResult<()> {
    let ok = !name.is_empty()
        && name != relay_refs::ALL_SCOPE
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidRepoName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes");
        let repo = Repository::init("notes", &path, "main").unwrap();
        assert!(repo.branch("main").unwrap().is_unborn());
        assert!(Repository::looks_like_repo(&path));

        let reopened = Repository::open("notes", &path).unwrap();
        assert_eq!(reopened.branches().unwrap().len(), 1);
        assert_eq!(reopened.location(), Some(path.as_path()));
        assert!(matches!(
            Repository::init("notes", &path, "main").unwrap_err(),
            EngineError::RepoExists(_)
        ));
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::open("x", dir.path()).unwrap_err(),
            EngineError::RepoNotFound(_)
        ));
    }

    #[test]
    fn missing_branch_and_ensure() {
        let repo = Repository::in_memory("r");
        assert!(matches!(
            repo.branch("main").unwrap_err(),
            EngineError::BranchNotFound { .. }
        ));
        repo.ensure_branch("main").unwrap();
        repo.ensure_branch("main").unwrap();
        assert_eq!(repo.head("main").unwrap(), None);
    }

    #[test]
    fn repo_names() {
        for ok in ["default", "films", "my-notes_2", "v1.0"] {
            assert!(validate_repo_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "all", ".git", "a/b", "has space"] {
            assert!(validate_repo_name(bad).is_err(), "{bad:?}");
        }
    }
}
