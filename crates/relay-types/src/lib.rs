//! Foundation types for Relay.
//!
//! Every other Relay crate depends on `relay-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash) for blobs,
//!   trees and commits
//! - [`RepoPath`]: A normalized, `/`-delimited path inside a repository tree

pub mod error;
pub mod object;
pub mod path;

pub use error::TypeError;
pub use object::ObjectId;
pub use path::RepoPath;
