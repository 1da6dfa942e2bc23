//! Loose-object store on the local filesystem.
//!
//! Layout, one file per object:
//!
//! ```text
//! <objects>/<first 2 hex chars>/<remaining 62 hex chars>
//! ```
//!
//! Each file holds the zstd-compressed bytes of `<kind>\n<data>`. Files are
//! written to a temporary name in the destination directory and renamed into
//! place, so a reader never sees a partial object and two writers racing on
//! the same id simply replace identical content.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use relay_types::ObjectId;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// Open (creating if needed) an object directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn encode(object: &StoredObject) -> StoreResult<Vec<u8>> {
        let mut framed = Vec::with_capacity(object.data.len() + 8);
        framed.extend_from_slice(object.kind.as_str().as_bytes());
        framed.push(b'\n');
        framed.extend_from_slice(&object.data);
        Ok(zstd::encode_all(framed.as_slice(), COMPRESSION_LEVEL)?)
    }

    fn decode(id: &ObjectId, compressed: &[u8]) -> StoreResult<StoredObject> {
        let framed = zstd::decode_all(compressed)?;
        let split = framed
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| StoreError::CorruptObject {
                id: *id,
                reason: "missing kind header".into(),
            })?;
        let kind = std::str::from_utf8(&framed[..split])
            .ok()
            .and_then(ObjectKind::parse)
            .ok_or_else(|| StoreError::CorruptObject {
                id: *id,
                reason: "unknown kind header".into(),
            })?;
        Ok(StoredObject::new(kind, framed[split + 1..].to_vec()))
    }
}

impl ObjectStore for FileObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let bytes = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = Self::decode(id, &bytes)?;
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.object_path(&id);
        if path.is_file() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Io(ErrorKind::InvalidInput.into()))?;
        fs::create_dir_all(dir)?;

        let encoded = Self::encode(object)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_data()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        tracing::trace!(%id, kind = %object.kind, "wrote loose object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, Tree, TreeEntry};

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path().join("objects")).unwrap();
        let blob = Blob::new(b"persisted".to_vec()).to_stored_object();
        let id = store.write(&blob).unwrap();
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.read(&id).unwrap(), Some(blob));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let tree = Tree::new(vec![TreeEntry::file("a.md", ObjectId::from_bytes(b"a"))])
            .to_stored_object()
            .unwrap();
        let id = FileObjectStore::open(dir.path()).unwrap().write(&tree).unwrap();

        let reopened = FileObjectStore::open(dir.path()).unwrap();
        let read = reopened.read(&id).unwrap().unwrap();
        assert_eq!(Tree::from_stored_object(read).unwrap().len(), 1);
    }

    #[test]
    fn detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = store
            .write(&Blob::new(b"original".to_vec()).to_stored_object())
            .unwrap();

        let forged = FileObjectStore::encode(&Blob::new(b"forged".to_vec()).to_stored_object())
            .unwrap();
        fs::write(store.object_path(&id), forged).unwrap();

        let err = store.read(&id).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
    }

    #[test]
    fn missing_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = ObjectId::from_bytes(b"absent");
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.delete(&id).unwrap());
    }
}
