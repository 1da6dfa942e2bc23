use std::time::Duration;

/// Errors raised while asking a validator (or any command boundary) for an
/// answer. A validator *rejecting* a commit is not an error; see
/// [`Decision`](crate::Decision).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No answer within the configured deadline.
    #[error("{boundary} timed out after {elapsed:?}")]
    Timeout {
        boundary: String,
        elapsed: Duration,
    },

    /// The collaborator could not be reached or answered garbage.
    #[error("{boundary} unreachable: {message}")]
    Unreachable { boundary: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    pub fn unreachable(boundary: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            boundary: boundary.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type GateResult<T> = Result<T, GateError>;
