//! Session token transport: the `Authorization` header, the session cookie and the
//! [`AuthUser`] extractor built on them.

use crate::Identity;
use crate::error::AUTH_REQUIRED;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use scribe_domain::constants::SESSION_COOKIE;
use scribe_kernel::ApiError;
use scribe_kernel::server::ApiState;
use std::time::Duration;

/// Bearer token if present, otherwise the session cookie.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value)
    })
}

fn cookie(value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}")
}

/// `Set-Cookie` value carrying a fresh session.
#[must_use]
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    cookie(token, ttl.as_secs(), secure)
}

/// `Set-Cookie` value that deletes the session cookie.
#[must_use]
pub fn expired_cookie(secure: bool) -> String {
    cookie("", 0, secure)
}

/// The caller, authenticated by a valid, unrevoked session token.
///
/// Rejects with `401 {"error": "Authentication required"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
}

impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, ApiError> {
        let identity = state.try_get_slice::<Identity>()?;
        let token =
            session_token(&parts.headers).ok_or_else(|| ApiError::unauthorized(AUTH_REQUIRED))?;

        match identity.sessions.verify(token) {
            Ok(claims) => Ok(Self { username: claims.sub }),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                Err(ApiError::unauthorized(AUTH_REQUIRED))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert(COOKIE, HeaderValue::from_static("scribe_session=cookie-token"));
        assert_eq!(session_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; scribe_session=tok; lang=en"));
        assert_eq!(session_token(&headers), Some("tok"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("scribe_session="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let set = session_cookie("tok", Duration::from_secs(60), true);
        assert_eq!(set, "scribe_session=tok; HttpOnly; Path=/; SameSite=Lax; Max-Age=60; Secure");
        assert!(expired_cookie(false).ends_with("Max-Age=0"));
    }
}
