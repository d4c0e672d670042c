//! The JSON error every handler returns.
//!
//! Request failures are answered with `{"error": "<message>"}`. Anything that is not an
//! authentication or lookup failure is a `400`, including internal faults, which are
//! logged with their context before the response is built.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scribe_database::DatabaseError;
use scribe_derive::api_model;
use scribe_storage::StorageError;
use std::borrow::Cow;
use tracing::{debug, error};

#[scribe_derive::scribe_error]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{message}")]
    Unauthorized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{message}")]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Body of every error response.
#[api_model]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized { message: message.into(), context: None }
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::Internal { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Text sent to the client. Context stays in the logs.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::Internal { .. }) {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            debug!(kind = self.kind(), %status, error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse { error: self.public_message().to_owned() })).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        Self::Internal { message: err.to_string().into(), context: Some(err.kind().into()) }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::FileNotFound { .. } => Self::not_found("File not found"),
            StorageError::PathTraversalAttempt { .. } => Self::bad_request("Invalid path"),
            other => Self::Internal {
                message: other.to_string().into(),
                context: Some(other.kind().into()),
            },
        }
    }
}
