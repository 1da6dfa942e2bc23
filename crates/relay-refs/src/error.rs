//! Error types for reference operations.

use relay_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefError {
    #[error("branch not found: {name}")]
    BranchNotFound { name: String },

    #[error("branch already exists: {name}")]
    AlreadyExists { name: String },

    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// The branch moved since the caller read it.
    #[error("branch {branch} moved: expected {}, found {}", fmt_head(.expected), fmt_head(.actual))]
    CasMismatch {
        branch: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    /// A ref file exists but does not hold a valid object id.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("ref store lock poisoned")]
    LockPoisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_head(head: &Option<ObjectId>) -> String {
    head.map(|id| id.short_hex())
        .unwrap_or_else(|| "<unborn>".into())
}

pub type Result<T> = std::result::Result<T, RefError>;
