//! In-memory reference store for tests and ephemeral servers.
//!
//! Each branch lives in its own `Mutex` cell. The outer `RwLock` guards only
//! the branch map, so a CAS on one branch never waits on a CAS on another.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use relay_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::BranchHead;

type Cell = Arc<Mutex<Option<ObjectId>>>;

#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    branches: RwLock<BTreeMap<String, Cell>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, name: &str) -> Result<Option<Cell>> {
        let branches = self.branches.read().map_err(|_| RefError::LockPoisoned)?;
        Ok(branches.get(name).cloned())
    }
}

impl RefStore for InMemoryRefStore {
    fn read_branch(&self, name: &str) -> Result<Option<BranchHead>> {
        let Some(cell) = self.cell(name)? else {
            return Ok(None);
        };
        let head = *cell.lock().map_err(|_| RefError::LockPoisoned)?;
        Ok(Some(BranchHead::new(name, head)))
    }

    fn list_branches(&self) -> Result<Vec<BranchHead>> {
        let cells: Vec<(String, Cell)> = {
            let branches = self.branches.read().map_err(|_| RefError::LockPoisoned)?;
            branches
                .iter()
                .map(|(name, cell)| (name.clone(), Arc::clone(cell)))
                .collect()
        };
        cells
            .into_iter()
            .map(|(name, cell)| {
                let head = *cell.lock().map_err(|_| RefError::LockPoisoned)?;
                Ok(BranchHead::new(name, head))
            })
            .collect()
    }

    fn create_branch(&self, name: &str, head: Option<ObjectId>) -> Result<()> {
        validate_branch_name(name)?;
        let mut branches = self.branches.write().map_err(|_| RefError::LockPoisoned)?;
        if branches.contains_key(name) {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        branches.insert(name.to_string(), Arc::new(Mutex::new(head)));
        Ok(())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> Result<()> {
        let cell = self.cell(name)?.ok_or_else(|| RefError::BranchNotFound {
            name: name.to_string(),
        })?;
        let mut head = cell.lock().map_err(|_| RefError::LockPoisoned)?;
        if *head != expected {
            return Err(RefError::CasMismatch {
                branch: name.to_string(),
                expected,
                actual: *head,
            });
        }
        *head = Some(new);
        Ok(())
    }
}
