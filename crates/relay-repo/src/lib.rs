//! The repository engine behind Relay.
//!
//! [`Engine`] composes the pieces a request needs:
//!
//! - [`RepoRegistry`]: the repositories a server exposes, discovered on disk
//! - [`resolver`]: header and query selectors to a `(repo, branch)` target
//! - [`read`]: files, synthesized listings and not-found documents
//! - [`write`]: candidate commit, validator, compare-and-swap, notify
//! - queries, delegated to `relay-index` with a resolved scope
//! - [`discovery`]: repositories, branches and heads, read-only

pub mod content;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod read;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod write;

pub use discovery::{Discovery, HeadRecord, CAPABILITIES};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use read::{Breadcrumb, FileContent, Listing, ListingEntry, NotFoundPage, ReadOutcome};
pub use registry::RepoRegistry;
pub use repository::{validate_repo_name, Repository};
pub use resolver::{Defaults, Selectors, Target};
pub use write::{Change, WritePolicy, WriteReceipt, Writer};

pub use relay_store::EntryMode;
