use relay_gate::GateError;
use relay_index::QueryError;
use relay_refs::RefError;
use relay_store::{EditError, StoreError};
use relay_types::{ObjectId, TypeError};
use thiserror::Error;

/// Everything a read, write, query or discovery call can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("branch not found: {branch} in {repo}")]
    BranchNotFound { repo: String, branch: String },

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid branch: {0}")]
    InvalidBranch(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    /// A file is in the way of a directory, or the reverse.
    #[error("path conflict at {0}")]
    PathConflict(String),

    #[error("extension not served: {0}")]
    DisallowedExtension(String),

    /// The validator's literal reason.
    #[error("{0}")]
    ValidationRejected(String),

    #[error("validator timed out: {0}")]
    ValidatorTimeout(String),

    #[error("validator unreachable: {0}")]
    ValidatorUnreachable(String),

    /// The branch moved between reading its head and the CAS.
    #[error("branch {branch} was modified concurrently (expected {}, found {})", show(.expected), show(.actual))]
    ConcurrentModification {
        branch: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    #[error("repository already exists: {0}")]
    RepoExists(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref store error: {0}")]
    Refs(RefError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn show(head: &Option<ObjectId>) -> String {
    head.map(|id| id.to_hex()).unwrap_or_else(|| "none".into())
}

impl From<RefError> for EngineError {
    fn from(e: RefError) -> Self {
        match e {
            RefError::CasMismatch {
                branch,
                expected,
                actual,
            } => Self::ConcurrentModification {
                branch,
                expected,
                actual,
            },
            RefError::InvalidBranchName { name, reason } => {
                Self::InvalidBranch(format!("{name}: {reason}"))
            }
            other => Self::Refs(other),
        }
    }
}

impl From<EditError> for EngineError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::EmptyPath => Self::InvalidPath("/".into()),
            EditError::Conflict(p) => Self::PathConflict(format!("/{p}")),
            EditError::Missing(p) => Self::PathNotFound(format!("/{p}")),
            EditError::Store(s) => Self::Store(s),
        }
    }
}

impl From<TypeError> for EngineError {
    fn from(e: TypeError) -> Self {
        Self::InvalidPath(e.to_string())
    }
}

impl From<GateError> for EngineError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Timeout { .. } => Self::ValidatorTimeout(e.to_string()),
            GateError::Unreachable { .. } | GateError::Config(_) => {
                Self::ValidatorUnreachable(e.to_string())
            }
        }
    }
}

impl EngineError {
    /// Short machine-readable kind, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RepoNotFound(_) => "RepoNotFound",
            Self::BranchNotFound { .. } => "BranchNotFound",
            Self::PathNotFound(_) => "PathNotFound",
            Self::InvalidPath(_) => "InvalidPath",
            Self::InvalidBranch(_) => "InvalidBranch",
            Self::InvalidRepoName(_) => "InvalidRepoName",
            Self::PathConflict(_) => "PathConflict",
            Self::DisallowedExtension(_) => "DisallowedExtension",
            Self::ValidationRejected(_) => "ValidationRejected",
            Self::ValidatorTimeout(_) => "ValidatorTimeout",
            Self::ValidatorUnreachable(_) => "ValidatorUnreachable",
            Self::ConcurrentModification { .. } => "ConcurrentModification",
            Self::RepoExists(_) => "RepoExists",
            Self::Query(QueryError::InvalidPagination(_)) => "InvalidPagination",
            Self::Query(QueryError::PolicyViolation(_)) => "QueryPolicyViolation",
            Self::Query(QueryError::Malformed(_)) => "MalformedQuery",
            Self::Query(QueryError::Index(e)) if e.is_timeout() => "IndexerTimeout",
            Self::Query(QueryError::Index(_)) => "IndexerUnavailable",
            Self::Store(_) => "ObjectStoreIOError",
            Self::Refs(_) => "RefStoreIOError",
            Self::Internal(_) => "Internal",
        }
    }

    /// `true` for repo/branch/path absence.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepoNotFound(_) | Self::BranchNotFound { .. } | Self::PathNotFound(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
