//! Typed helpers over a raw [`ObjectStore`]: encode/decode with kind checks,
//! path lookup inside a tree, and commit history walks.

use relay_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, EntryMode, Tree};
use crate::traits::ObjectStore;

/// Where a path landed inside a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Located {
    File(ObjectId),
    Directory(ObjectId),
}

pub fn write_blob(store: &dyn ObjectStore, data: &[u8]) -> StoreResult<ObjectId> {
    store.write(&Blob::new(data.to_vec()).to_stored_object())
}

pub fn write_tree(store: &dyn ObjectStore, tree: &Tree) -> StoreResult<ObjectId> {
    store.write(&tree.to_stored_object()?)
}

pub fn write_commit(store: &dyn ObjectStore, commit: &Commit) -> StoreResult<ObjectId> {
    store.write(&commit.to_stored_object()?)
}

pub fn read_blob(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Vec<u8>> {
    let obj = store.read(id)?.ok_or(StoreError::NotFound(*id))?;
    Ok(Blob::from_stored_object(obj)?.data)
}

pub fn read_tree(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Tree> {
    let obj = store.read(id)?.ok_or(StoreError::NotFound(*id))?;
    Tree::from_stored_object(obj)
}

pub fn read_commit(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Commit> {
    let obj = store.read(id)?.ok_or(StoreError::NotFound(*id))?;
    Commit::from_stored_object(obj)
}

/// Walk `segments` down from `root`.
///
/// Returns `Ok(None)` when a segment is missing or when a file is found
/// before the last segment. Missing *objects* (as opposed to missing names)
/// are store errors.
pub fn lookup_path(
    store: &dyn ObjectStore,
    root: &ObjectId,
    segments: &[String],
) -> StoreResult<Option<Located>> {
    let mut current = Located::Directory(*root);
    for segment in segments {
        let tree_id = match current {
            Located::Directory(id) => id,
            Located::File(_) => return Ok(None),
        };
        let tree = read_tree(store, &tree_id)?;
        current = match tree.get(segment) {
            Some(entry) if entry.mode == EntryMode::Directory => {
                Located::Directory(entry.object_id)
            }
            Some(entry) => Located::File(entry.object_id),
            None => return Ok(None),
        };
    }
    Ok(Some(current))
}

/// Walk first-parent history from `head`, newest first, at most `limit`
/// commits.
pub fn history(
    store: &dyn ObjectStore,
    head: &ObjectId,
    limit: usize,
) -> StoreResult<Vec<(ObjectId, Commit)>> {
    let mut out = Vec::new();
    let mut next = Some(*head);
    while let Some(id) = next {
        if out.len() >= limit {
            break;
        }
        let commit = read_commit(store, &id)?;
        next = commit.parent;
        out.push((id, commit));
    }
    Ok(out)
}
