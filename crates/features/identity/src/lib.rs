//! Identity slice: registration, login/logout and request authentication.
//!
//! Accounts live in the `user` table with Argon2id password hashes. A login yields an
//! HS256 session token, returned in the body and as an `HttpOnly` cookie. Logout puts the
//! token id on a revocation list that outlives the token.

mod error;
mod extract;
mod handlers;
pub mod password;
mod repository;
mod session;

pub use error::{IdentityError, IdentityErrorExt};
pub use extract::{AuthUser, expired_cookie, session_cookie, session_token};
pub use handlers::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
pub use repository::{UserRecord, UserRepository};
pub use session::{Claims, IssuedSession, Sessions};

use scribe_database::Database;
use scribe_domain::config::ApiConfig;
use scribe_kernel::domain::registry::InitializedSlice;
use scribe_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Identity feature state.
#[scribe_derive::scribe_slice]
pub struct Identity {
    pub users: UserRepository,
    pub sessions: Sessions,
    pub cookie_secure: bool,
}

/// Initialize the identity feature.
///
/// # Errors
/// [`IdentityError::Validation`] if the signing secret is blank.
pub fn init(config: &ApiConfig, database: &Database) -> Result<InitializedSlice, IdentityError> {
    let identity = &config.security.identity;
    if identity.jwt.secret.trim().is_empty() {
        return Err(IdentityError::Validation {
            message: "JWT secret must not be empty".into(),
            context: Some("security.identity.jwt.secret".into()),
        });
    }

    let slice = Identity::new(IdentityInner {
        users: UserRepository::new(database.clone()),
        sessions: Sessions::new(identity),
        cookie_secure: identity.cookie_secure,
    });
    tracing::info!(issuer = %identity.jwt.issuer, "Identity slice initialized");

    Ok(InitializedSlice::new(slice))
}

/// `POST /register`, `POST /login`, `POST /logout`.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::register))
        .routes(routes!(handlers::login))
        .routes(routes!(handlers::logout))
}
