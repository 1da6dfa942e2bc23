//! Content-addressed object storage for Relay.
//!
//! Every repository is an append-only graph of immutable objects identified
//! by their BLAKE3 hash (domain-separated by kind), analogous to git's
//! `.git/objects/` directory.
//!
//! # Object Types
//!
//! - [`Blob`] -- file contents
//! - [`Tree`] -- directory snapshot mapping names to blobs and subtrees
//! - [`Commit`] -- `(tree, parent, timestamp)` history node
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileObjectStore`] -- zstd-compressed loose objects on disk
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write-then-link: objects are written first; a branch ref is advanced
//!    only afterwards, so unreferenced objects are never visible.
//! 3. Concurrent reads and writes need no locking beyond the backend's own.
//! 4. Garbage collection of unreachable objects is a separate maintenance
//!    concern and never happens on the request path.

pub mod access;
pub mod edit;
pub mod error;
pub mod fs;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use access::{
    history, lookup_path, read_blob, read_commit, read_tree, write_blob, write_commit, write_tree,
    Located,
};
pub use edit::{remove_file, upsert_file, EditError, EditResult};
pub use error::{StoreError, StoreResult};
pub use fs::FileObjectStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
