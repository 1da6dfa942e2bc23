use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use relay_index::QueryError;
use relay_repo::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// An engine error on its way to the client as `{"error", "message"}`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

pub fn status_for(error: &EngineError) -> StatusCode {
    use EngineError::*;
    match error {
        RepoNotFound(_) | BranchNotFound { .. } | PathNotFound(_) => StatusCode::NOT_FOUND,
        InvalidPath(_) | InvalidBranch(_) | InvalidRepoName(_) => StatusCode::BAD_REQUEST,
        PathConflict(_) | ConcurrentModification { .. } | RepoExists(_) => StatusCode::CONFLICT,
        DisallowedExtension(_) => StatusCode::FORBIDDEN,
        ValidationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ValidatorTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ValidatorUnreachable(_) => StatusCode::BAD_GATEWAY,
        Query(QueryError::Index(e)) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        Query(QueryError::Index(_)) => StatusCode::BAD_GATEWAY,
        Query(_) => StatusCode::BAD_REQUEST,
        Store(_) | Refs(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "request refused");
        }
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
