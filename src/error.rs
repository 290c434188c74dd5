//! Service-level error taxonomy.
//!
//! The storage layer reports plain `anyhow` errors; everything the service
//! and API layers reject is one of these variants so callers get a
//! machine-readable reason instead of a string to pattern-match.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Empty or malformed required input. Carries a short reason code.
    #[error("{0}")]
    Validation(&'static str),

    /// The id does not resolve to a record of the expected kind.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The actor lacks the required capability or record-level permission,
    /// or presented an invalid action token.
    #[error("forbidden")]
    Forbidden,

    /// The underlying store failed. Propagated without retry.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not-found",
            Self::Forbidden => "forbidden",
            Self::Store(_) => "storage",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store failures are logged in full but never leak details to the
        // client; everything else is safe to expose.
        let reason = match &self {
            Self::Store(e) => {
                tracing::error!("storage failure: {e:#}");
                "internal error".to_string()
            }
            other => {
                tracing::warn!("request rejected: {other}");
                other.to_string()
            }
        };

        (status, Json(json!({ "error": self.kind(), "reason": reason }))).into_response()
    }
}
