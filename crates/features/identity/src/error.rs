use scribe_database::DatabaseError;
use scribe_kernel::ApiError;
use std::borrow::Cow;

pub(crate) const AUTH_REQUIRED: &str = "Authentication required";

#[scribe_derive::scribe_error]
pub enum IdentityError {
    /// Registration input rejected; the message is shown to the user.
    #[error("{message}")]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("A user with that username already exists.")]
    DuplicateUser { context: Option<Cow<'static, str>> },

    #[error("Invalid username or password")]
    InvalidCredentials { context: Option<Cow<'static, str>> },

    #[error("Invalid session token{}: {source}", format_context(.context))]
    Token { source: jsonwebtoken::errors::Error, context: Option<Cow<'static, str>> },

    #[error("Session has been revoked")]
    Revoked { context: Option<Cow<'static, str>> },

    #[error("Password hashing failed{}: {message}", format_context(.context))]
    Hash { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Identity storage error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal identity error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<argon2::password_hash::Error> for IdentityError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash { message: err.to_string().into(), context: None }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation { message, context } => Self::BadRequest { message, context },
            IdentityError::DuplicateUser { .. } => Self::bad_request(err.to_string()),
            IdentityError::InvalidCredentials { .. } => Self::unauthorized(err.to_string()),
            IdentityError::Token { .. } | IdentityError::Revoked { .. } => {
                Self::unauthorized(AUTH_REQUIRED)
            },
            other => Self::Internal {
                message: other.to_string().into(),
                context: Some(other.kind().into()),
            },
        }
    }
}
