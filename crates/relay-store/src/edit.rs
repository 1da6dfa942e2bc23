//! Copy-on-write tree edits.
//!
//! An edit never touches an existing object: it writes a new blob/tree chain
//! from the changed leaf up to a new root and returns the new root id. The
//! old root stays valid, which is what lets readers keep using a snapshot
//! while a write is in flight.

use relay_types::ObjectId;

use crate::access::{read_tree, write_tree};
use crate::error::StoreError;
use crate::object::{EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The path is empty (the root cannot be replaced by a file).
    #[error("path must name a file")]
    EmptyPath,

    /// A file sits where a directory is needed, or vice versa.
    #[error("path conflict at /{0}")]
    Conflict(String),

    /// The path to delete does not exist.
    #[error("no such file: /{0}")]
    Missing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EditResult<T> = Result<T, EditError>;

/// Insert or replace the file at `segments` with `blob`, creating
/// intermediate directories. `root` is `None` for an unborn branch.
pub fn upsert_file(
    store: &dyn ObjectStore,
    root: Option<&ObjectId>,
    segments: &[String],
    blob: ObjectId,
) -> EditResult<ObjectId> {
    if segments.is_empty() {
        return Err(EditError::EmptyPath);
    }
    upsert_at(store, root.copied(), segments, 0, blob)
}

fn upsert_at(
    store: &dyn ObjectStore,
    tree_id: Option<ObjectId>,
    segments: &[String],
    depth: usize,
    blob: ObjectId,
) -> EditResult<ObjectId> {
    let mut tree = match tree_id {
        Some(id) => read_tree(store, &id)?,
        None => Tree::empty(),
    };
    let name = &segments[depth];
    let existing = tree.get(name).map(|e| (e.mode, e.object_id));
    let is_leaf = depth + 1 == segments.len();

    let entry = match (is_leaf, existing) {
        (true, Some((EntryMode::Directory, _))) => {
            return Err(EditError::Conflict(segments[..=depth].join("/")))
        }
        (true, _) => TreeEntry::file(name.clone(), blob),
        (false, Some((EntryMode::File, _))) => {
            return Err(EditError::Conflict(segments[..=depth].join("/")))
        }
        (false, child) => {
            let child_id = upsert_at(store, child.map(|(_, id)| id), segments, depth + 1, blob)?;
            TreeEntry::directory(name.clone(), child_id)
        }
    };
    tree.upsert(entry);
    Ok(write_tree(store, &tree)?)
}

/// Remove the file at `segments`. Directories left empty by the removal are
/// pruned; the root itself is kept (possibly as an empty tree).
pub fn remove_file(
    store: &dyn ObjectStore,
    root: Option<&ObjectId>,
    segments: &[String],
) -> EditResult<ObjectId> {
    if segments.is_empty() {
        return Err(EditError::EmptyPath);
    }
    let root = root.ok_or_else(|| EditError::Missing(segments.join("/")))?;
    match remove_at(store, root, segments, 0)? {
        Some(id) => Ok(id),
        None => Ok(write_tree(store, &Tree::empty())?),
    }
}

/// Returns `None` when the resulting tree is empty.
fn remove_at(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    segments: &[String],
    depth: usize,
) -> EditResult<Option<ObjectId>> {
    let mut tree = read_tree(store, tree_id)?;
    let name = &segments[depth];
    let is_leaf = depth + 1 == segments.len();
    let missing = || EditError::Missing(segments.join("/"));

    match (is_leaf, tree.get(name).map(|e| (e.mode, e.object_id))) {
        (_, None) | (false, Some((EntryMode::File, _))) => return Err(missing()),
        (true, Some((EntryMode::Directory, _))) => {
            return Err(EditError::Conflict(segments.join("/")))
        }
        (true, Some((EntryMode::File, _))) => {
            tree.remove(name);
        }
        (false, Some((EntryMode::Directory, child))) => {
            match remove_at(store, &child, segments, depth + 1)? {
                Some(new_child) => tree.upsert(TreeEntry::directory(name.clone(), new_child)),
                None => {
                    tree.remove(name);
                }
            }
        }
    }

    if tree.is_empty() {
        return Ok(None);
    }
    Ok(Some(write_tree(store, &tree)?))
}
