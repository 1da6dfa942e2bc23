//! Secondary index boundary and query engine for Relay.
//!
//! The index itself is owned by an [`Indexer`]: an out-of-process program
//! ([`CommandIndexer`]) or the in-process [`MemoryIndex`]. This crate owns
//! the contract around it:
//!
//! - [`QueryEngine`] validates a [`QueryRequest`], enforces the indexer's
//!   [`QueryPolicy`] allow-list before the index is touched, clamps
//!   pagination, appends the `(repo, branch, path)` tie-break to every sort
//!   and shapes the [`QueryEnvelope`].
//! - [`CommitNotice`]s tell the indexer that a branch moved.

pub mod engine;
pub mod error;
pub mod indexer;
pub mod memory;
pub mod model;

pub use engine::{QueryEngine, QueryEnvelope, QueryLimits, QueryRequest, QueryScope};
pub use error::{IndexError, IndexResult, QueryError, QueryResult};
pub use indexer::{CommandIndexer, Indexer};
pub use memory::MemoryIndex;
pub use model::{
    compare_values, CommitNotice, Condition, DocumentKey, FilterOp, IndexDocument, IndexQuery,
    QueryHits, QueryPolicy, Selection, SortKey, PRIMARY_KEY,
};
