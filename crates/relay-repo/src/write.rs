//! The write path.
//!
//! A write builds a complete candidate commit off to the side, shows it to
//! the validator, and only then tries to move the branch with a
//! compare-and-swap against the head it started from. Nothing is reachable
//! until the swap succeeds, so every failure leaves the branch untouched.

use std::sync::Arc;
use std::time::Duration;

use relay_gate::{EntryChange, ValidationRequest, Verdict, WriteGate, WriteOperation};
use relay_index::{CommitNotice, Indexer};
use relay_refs::RefError;
use relay_store::{
    lookup_path, read_commit, remove_file, upsert_file, write_blob, write_commit, Commit, Located,
};
use relay_types::{ObjectId, RepoPath};
use serde::Serialize;

use crate::content::is_disallowed;
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;

/// A change to one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Put(Vec<u8>),
    Delete,
}

impl Change {
    fn operation(&self) -> WriteOperation {
        match self {
            Self::Put(_) => WriteOperation::Put,
            Self::Delete => WriteOperation::Delete,
        }
    }
}

/// Returned for every accepted write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub repo: String,
    pub branch: String,
    pub commit: ObjectId,
    pub parent: Option<ObjectId>,
    pub path: String,
    /// `true` when a put created a new file (as opposed to replacing one).
    #[serde(skip)]
    pub created: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct WritePolicy {
    /// Create a missing branch on its first put.
    pub auto_create_branches: bool,
    /// Deadline for the post-commit indexer notification.
    pub indexer_timeout: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            auto_create_branches: true,
            indexer_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct Writer {
    gate: WriteGate,
    indexer: Arc<dyn Indexer>,
    policy: WritePolicy,
}

impl Writer {
    pub fn new(gate: WriteGate, indexer: Arc<dyn Indexer>, policy: WritePolicy) -> Self {
        Self {
            gate,
            indexer,
            policy,
        }
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    /// Run [`Writer::apply`] on its own task so that a dropped caller cannot
    /// cancel it between validation and the ref swap.
    pub async fn submit(
        &self,
        repo: Arc<Repository>,
        branch: String,
        path: RepoPath,
        change: Change,
    ) -> EngineResult<WriteReceipt> {
        let writer = self.clone();
        tokio::spawn(async move { writer.apply(&repo, &branch, &path, change).await })
            .await
            .map_err(|e| EngineError::Internal(format!("write task failed: {e}")))?
    }

    pub async fn apply(
        &self,
        repo: &Repository,
        branch: &str,
        path: &RepoPath,
        change: Change,
    ) -> EngineResult<WriteReceipt> {
        if path.is_root() || path.wants_directory() {
            return Err(EngineError::InvalidPath(format!(
                "writes need a file path, not {}",
                path.to_url_path()
            )));
        }
        if matches!(change, Change::Put(_)) && is_disallowed(path) {
            return Err(EngineError::DisallowedExtension(path.to_url_path()));
        }

        // 1. Resolve the branch; a missing one is created at swap time.
        let existing = repo.refs().read_branch(branch)?;
        if existing.is_none() && !(self.policy.auto_create_branches && change != Change::Delete) {
            return Err(EngineError::BranchNotFound {
                repo: repo.name().to_string(),
                branch: branch.to_string(),
            });
        }
        let parent = existing.as_ref().and_then(|b| b.head);

        // 2-3. Candidate tree from the parent snapshot.
        let store = repo.objects();
        let old_root = match parent {
            Some(id) => Some(read_commit(store, &id)?.tree),
            None => None,
        };
        let segments = path.segments();
        let previous = match &old_root {
            Some(root) => lookup_path(store, root, segments)?,
            None => None,
        };
        let old_blob = match previous {
            Some(Located::File(id)) => Some(id),
            _ => None,
        };
        let (new_root, created, entry) = match &change {
            Change::Put(bytes) => {
                let blob = write_blob(store, bytes)?;
                let new_root = upsert_file(store, old_root.as_ref(), segments, blob)?;
                let entry = EntryChange::put(path.to_url_path(), old_blob, blob, bytes);
                (new_root, previous.is_none(), entry)
            }
            Change::Delete => {
                let new_root = remove_file(store, old_root.as_ref(), segments)?;
                (new_root, false, EntryChange::delete(path.to_url_path(), old_blob))
            }
        };
        let repo_dir = repo.location().map(|dir| dir.to_path_buf());

        // 4. Candidate commit, written but unreachable.
        let message = match &change {
            Change::Put(_) => format!("put {path}"),
            Change::Delete => format!("delete {path}"),
        };
        let commit = write_commit(store, &Commit::new(new_root, parent, message))?;

        // 5. Validation.
        let request = ValidationRequest {
            repo: repo.name().to_string(),
            repo_dir: repo_dir.clone(),
            branch: branch.to_string(),
            old_commit: parent,
            new_commit: commit,
            path: path.to_url_path(),
            operation: change.operation(),
            changes: vec![entry.clone()],
        };
        let outcome = self.gate.evaluate(&request).await?;
        if let Verdict::Reject { reason } = outcome.verdict {
            return Err(EngineError::ValidationRejected(reason));
        }

        // 6. Swap.
        match existing {
            Some(_) => repo.refs().compare_and_swap(branch, parent, commit)?,
            None => match repo.refs().create_branch(branch, Some(commit)) {
                Ok(()) => {}
                Err(RefError::AlreadyExists { .. }) => {
                    return Err(EngineError::ConcurrentModification {
                        branch: branch.to_string(),
                        expected: None,
                        actual: repo.head(branch)?,
                    })
                }
                Err(e) => return Err(e.into()),
            },
        }
        tracing::info!(
            repo = repo.name(),
            branch,
            path = %path,
            %commit,
            parent = ?parent.map(|p| p.short_hex()),
            "committed write"
        );

        // 7. Best-effort index notification.
        self.notify(CommitNotice {
            repo: repo.name().to_string(),
            repo_dir,
            branch: branch.to_string(),
            commit,
            parent,
            changes: vec![entry],
        })
        .await;

        Ok(WriteReceipt {
            repo: repo.name().to_string(),
            branch: branch.to_string(),
            commit,
            parent,
            path: path.to_url_path(),
            created,
        })
    }

    async fn notify(&self, notice: CommitNotice) {
        let indexer = self.indexer.name().to_string();
        match tokio::time::timeout(self.policy.indexer_timeout, self.indexer.notify(&notice)).await
        {
            Ok(Ok(())) => tracing::debug!(%indexer, commit = %notice.commit, "indexer notified"),
            Ok(Err(e)) => tracing::warn!(%indexer, commit = %notice.commit, error = %e, "indexer notification failed"),
            Err(_) => tracing::warn!(%indexer, commit = %notice.commit, "indexer notification timed out"),
        }
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("gate", &self.gate)
            .field("indexer", &self.indexer.name())
            .field("policy", &self.policy)
            .finish()
    }
}
