//! HS256 session tokens and their revocation list.

use crate::error::IdentityError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::sync::Cache;
use scribe_domain::config::IdentityConfig;
use scribe_kernel::safe_nanoid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    /// Token id, the revocation key.
    pub jti: String,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
}

/// Signs, verifies and revokes session tokens.
///
/// Revoked ids are kept for one token lifetime, after which the token would fail the
/// expiry check anyway.
pub struct Sessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
    revoked: Cache<String, ()>,
}

impl fmt::Debug for Sessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessions")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("revoked", &self.revoked.entry_count())
            .finish_non_exhaustive()
    }
}

impl Sessions {
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        let jwt = &config.jwt;
        if jwt.secret == "dev-only-change-me" {
            tracing::warn!("Session tokens are signed with the development secret");
        }

        let ttl = Duration::from_secs(jwt.ttl_seconds.max(1));
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&jwt.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = jwt.clock_skew_seconds;

        let revoked = Cache::builder()
            .max_capacity(config.session_cache_capacity)
            .time_to_live(ttl + Duration::from_secs(jwt.clock_skew_seconds))
            .build();

        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            validation,
            issuer: jwt.issuer.clone(),
            ttl,
            revoked,
        }
    }

    /// Token lifetime, also the cookie `Max-Age`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a new token for `username`.
    ///
    /// # Errors
    /// [`IdentityError::Token`] if encoding fails.
    pub fn issue(&self, username: &str) -> Result<IssuedSession, IdentityError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: username.to_owned(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl.as_secs(),
            jti: safe_nanoid!(21),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedSession { token, claims })
    }

    /// Checks signature, issuer, expiry and revocation.
    ///
    /// # Errors
    /// [`IdentityError::Token`] for a bad token, [`IdentityError::Revoked`] after logout.
    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if self.revoked.contains_key(&claims.jti) {
            return Err(IdentityError::Revoked { context: Some(claims.sub.into()) });
        }
        Ok(claims)
    }

    pub fn revoke(&self, claims: &Claims) {
        self.revoked.insert(claims.jti.clone(), ());
    }
}
