use crate::Identity;
use crate::error::IdentityError;
use crate::extract::{expired_cookie, session_cookie, session_token};
use crate::password::{hash_password, validate_registration, verify_password};
use axum::Json;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use scribe_derive::{api_handler, api_model};
use scribe_domain::constants::IDENTITY_TAG;
use scribe_kernel::extract::JsonBody;
use scribe_kernel::server::ApiState;
use scribe_kernel::{ApiError, ErrorResponse};

#[api_model]
#[derive(Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[api_model]
#[derive(Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[api_model]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[api_model]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    /// Also set as the `scribe_session` cookie.
    pub token: String,
}

/// Runs CPU-heavy password work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, IdentityError>
where
    F: FnOnce() -> Result<T, IdentityError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| IdentityError::from(format!("Password task failed: {e}")))?
}

fn with_cookie(cookie: &str, body: impl IntoResponse) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::from(format!("Invalid cookie header: {e}")))?;
    Ok(([(SET_COOKIE, value)], body).into_response())
}

#[api_handler(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = OK, description = "Account created", body = MessageResponse),
        (status = BAD_REQUEST, description = "Rejected credentials", body = ErrorResponse),
    ),
    tag = IDENTITY_TAG,
)]
pub async fn register(
    State(state): State<ApiState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = state.try_get_slice::<Identity>()?;
    let username = req.username.trim().to_owned();
    validate_registration(&username, &req.password, &req.password_confirm)?;

    if identity.users.is_taken(&username).await? {
        return Err(IdentityError::DuplicateUser { context: None }.into());
    }

    let password = req.password;
    let hash = blocking(move || hash_password(&password)).await?;
    identity.users.create(&username, hash).await?;
    tracing::info!(username = %username, "User registered");

    Ok(Json(MessageResponse {
        success: true,
        message: "Account created successfully. You can now log in.".to_owned(),
    }))
}

#[api_handler(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = OK, description = "Session issued, cookie set", body = LoginResponse),
        (status = UNAUTHORIZED, description = "Wrong username or password", body = ErrorResponse),
    ),
    tag = IDENTITY_TAG,
)]
pub async fn login(
    State(state): State<ApiState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let identity = state.try_get_slice::<Identity>()?;
    let username = req.username.trim();

    let Some(user) = identity.users.find(username).await? else {
        return Err(IdentityError::InvalidCredentials { context: None }.into());
    };

    let (password, phc) = (req.password, user.password_hash);
    if !blocking(move || verify_password(&password, &phc)).await? {
        tracing::debug!(username = %user.username, "Login refused");
        return Err(IdentityError::InvalidCredentials { context: None }.into());
    }

    let session = identity.sessions.issue(&user.username)?;
    tracing::info!(username = %user.username, "User logged in");

    let cookie = session_cookie(&session.token, identity.sessions.ttl(), identity.cookie_secure);
    with_cookie(
        &cookie,
        Json(LoginResponse { success: true, username: user.username, token: session.token }),
    )
}

#[api_handler(
    post,
    path = "/logout",
    responses((status = OK, description = "Session revoked", body = MessageResponse)),
    tag = IDENTITY_TAG,
)]
pub async fn logout(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = state.try_get_slice::<Identity>()?;

    if let Some(claims) = session_token(&headers).and_then(|t| identity.sessions.verify(t).ok()) {
        identity.sessions.revoke(&claims);
        tracing::info!(username = %claims.sub, "User logged out");
    }

    with_cookie(
        &expired_cookie(identity.cookie_secure),
        Json(MessageResponse { success: true, message: "Successfully logged out.".to_owned() }),
    )
}
