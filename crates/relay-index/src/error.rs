use relay_gate::GateError;

/// Failures of an [`Indexer`](crate::Indexer) backend.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Timeout or transport failure talking to an out-of-process indexer.
    #[error(transparent)]
    Boundary(#[from] GateError),

    /// The backend answered but refused the request.
    #[error("indexer error: {0}")]
    Backend(String),
}

impl IndexError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Boundary(e) if e.is_timeout())
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Errors surfaced by the query engine.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// `page`/`pageSize` is non-numeric or negative.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// A filter or sort names a field or operator the indexer does not allow.
    #[error("query policy violation: {0}")]
    PolicyViolation(String),

    /// The request body is not shaped like a query.
    #[error("malformed query: {0}")]
    Malformed(String),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type QueryResult<T> = Result<T, QueryError>;
