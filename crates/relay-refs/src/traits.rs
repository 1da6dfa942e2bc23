//! The [`RefStore`] trait.

use relay_types::ObjectId;

use crate::error::Result;
use crate::types::BranchHead;

/// Storage backend for the branch refs of one repository.
///
/// The only way to move an existing branch is [`RefStore::compare_and_swap`];
/// there is no unconditional overwrite, so a branch head can never move
/// backwards under concurrent writers. Backends must serialize CAS calls per
/// branch only, never across branches.
pub trait RefStore: Send + Sync {
    /// Read a branch. `Ok(None)` if the branch does not exist.
    fn read_branch(&self, name: &str) -> Result<Option<BranchHead>>;

    /// All branches, sorted by name.
    fn list_branches(&self) -> Result<Vec<BranchHead>>;

    /// Create a branch pointing at `head` (or unborn).
    ///
    /// Fails with `AlreadyExists` if the branch is present.
    fn create_branch(&self, name: &str, head: Option<ObjectId>) -> Result<()>;

    /// Atomically set the branch to `new` if it still points at `expected`.
    ///
    /// Fails with `BranchNotFound` if the branch does not exist and with
    /// `CasMismatch` if its head differs from `expected`.
    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: ObjectId)
        -> Result<()>;

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read_branch(name)?.is_some())
    }

    fn branch_names(&self) -> Result<Vec<String>> {
        Ok(self
            .list_branches()?
            .into_iter()
            .map(|b| b.name)
            .collect())
    }
}
