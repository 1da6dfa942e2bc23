//! Reference store on the local filesystem.
//!
//! One file per branch under the heads directory:
//!
//! ```text
//! <repo>/refs/heads/main            -> "<64 hex chars>\n"
//! <repo>/refs/heads/feature/auth    -> ""   (unborn)
//! ```
//!
//! Updates write a temporary file next to the ref and rename it into place.
//! CAS is serialized per branch by an in-process lock, which makes this store
//! safe for a single server process owning the repository.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use relay_types::ObjectId;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::BranchHead;

#[derive(Debug)]
pub struct FileRefStore {
    heads: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileRefStore {
    /// Open (creating if needed) a heads directory.
    pub fn open(heads: impl Into<PathBuf>) -> Result<Self> {
        let heads = heads.into();
        fs::create_dir_all(&heads)?;
        Ok(Self {
            heads,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn heads_dir(&self) -> &Path {
        &self.heads
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.heads.clone(), |p, c| p.join(c))
    }

    fn branch_lock(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| RefError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(name.to_string()).or_default()))
    }

    fn load(&self, name: &str) -> Result<Option<Option<ObjectId>>> {
        let path = self.ref_path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if path.is_dir() => {
                tracing::trace!(branch = name, error = %e, "ref path is a namespace");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(Some(None));
        }
        let id = ObjectId::from_hex(text).map_err(|e| RefError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(Some(id)))
    }

    fn store(&self, name: &str, head: Option<ObjectId>) -> Result<()> {
        let path = self.ref_path(name);
        let dir = path
            .parent()
            .ok_or_else(|| RefError::Io(ErrorKind::InvalidInput.into()))?;
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        if let Some(id) = head {
            writeln!(tmp, "{}", id.to_hex())?;
        }
        tmp.as_file().sync_data()?;
        tmp.persist(&path).map_err(|e| RefError::Io(e.error))?;
        Ok(())
    }

    /// `feature` and `feature/x` cannot both exist: one would be a file and
    /// the other a directory at the same path.
    fn check_namespace(&self, name: &str) -> Result<()> {
        let clash = |other: &str| RefError::InvalidBranchName {
            name: name.to_string(),
            reason: format!("conflicts with branch namespace '{other}'"),
        };
        let mut prefix = String::new();
        let components: Vec<&str> = name.split('/').collect();
        for component in &components[..components.len() - 1] {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            if self.ref_path(&prefix).is_file() {
                return Err(clash(&prefix));
            }
        }
        if self.ref_path(name).is_dir() {
            return Err(clash(name));
        }
        Ok(())
    }
}

impl RefStore for FileRefStore {
    fn read_branch(&self, name: &str) -> Result<Option<BranchHead>> {
        if validate_branch_name(name).is_err() {
            return Ok(None);
        }
        Ok(self.load(name)?.map(|head| BranchHead::new(name, head)))
    }

    fn list_branches(&self) -> Result<Vec<BranchHead>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.heads).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RefError::Io(e.into_io_error().unwrap_or_else(|| ErrorKind::Other.into()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.heads) else {
                continue;
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            // Skips in-flight temp files, whose names start with '.'.
            if validate_branch_name(&name).is_err() {
                continue;
            }
            if let Some(head) = self.load(&name)? {
                out.push(BranchHead::new(name, head));
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn create_branch(&self, name: &str, head: Option<ObjectId>) -> Result<()> {
        validate_branch_name(name)?;
        let lock = self.branch_lock(name)?;
        let _guard = lock.lock().map_err(|_| RefError::LockPoisoned)?;
        if self.load(name)?.is_some() {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        self.check_namespace(name)?;
        self.store(name, head)?;
        tracing::debug!(branch = name, unborn = head.is_none(), "created branch");
        Ok(())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> Result<()> {
        validate_branch_name(name)?;
        let lock = self.branch_lock(name)?;
        let _guard = lock.lock().map_err(|_| RefError::LockPoisoned)?;
        let actual = self.load(name)?.ok_or_else(|| RefError::BranchNotFound {
            name: name.to_string(),
        })?;
        if actual != expected {
            return Err(RefError::CasMismatch {
                branch: name.to_string(),
                expected,
                actual,
            });
        }
        self.store(name, Some(new))?;
        tracing::trace!(branch = name, head = %new, "advanced branch");
        Ok(())
    }
}
