//! Error types for the HTTP layer.
//!
//! [`ObserverError`] unifies every failure a handler can hit into one enum
//! that converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body is
//! always `{"error": <message>, "status": <code>}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moisture_core::error::StoreError;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request body parsed but failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The request body could not be parsed.
    #[error("invalid body: {0}")]
    Body(#[from] JsonRejection),

    /// The query string could not be parsed.
    #[error("invalid query: {0}")]
    Query(#[from] QueryRejection),
}

impl ObserverError {
    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidArgument { .. }) | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Body(rejection) => rejection.status(),
            Self::Query(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
