use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use scribe_database::Database;
use scribe_domain::config::ApiConfig;
use scribe_identity::{AuthUser, Identity, init, router};
use scribe_kernel::server::ApiState;
use scribe_storage::Storage;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn whoami(user: AuthUser) -> String {
    user.username
}

async fn app(tmp: &tempfile::TempDir) -> Router {
    let config = ApiConfig::default();
    let database =
        Database::builder().url("mem://").session("test", "identity").init().await.expect("db");
    let storage =
        Storage::builder().root(tmp.path()).sharding(false).connect().await.expect("storage");

    let state = ApiState::builder()
        .register_slice(init(&config, &database).expect("identity"))
        .config(config)
        .db(database)
        .storage(storage)
        .build()
        .expect("state");

    let (router, _api) = router().split_for_parts();
    router.route("/whoami", get(whoami)).with_state(state)
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    // Plain-text bodies (the test route) come back as a JSON string.
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Reply { status, cookie, body }
}

fn post(path: &str, body: &Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn register(app: &Router, username: &str, password: &str) -> Reply {
    send(
        app,
        post(
            "/register",
            &json!({ "username": username, "password": password, "password_confirm": password }),
        ),
    )
    .await
}

#[tokio::test]
async fn register_login_whoami_logout() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let reply = register(&app, "alice", "s3cret-pass").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);

    let credentials = json!({ "username": "alice", "password": "s3cret-pass" });
    let login = send(&app, post("/login", &credentials)).await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["username"], "alice");
    let token = login.body["token"].as_str().expect("token").to_owned();
    let cookie = login.cookie.expect("session cookie");
    assert!(cookie.starts_with(&format!("scribe_session={token};")));
    assert!(cookie.contains("HttpOnly"));

    let me = send(
        &app,
        Request::get("/whoami")
            .header(header::COOKIE, format!("scribe_session={token}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body, Value::String("alice".to_owned()));

    let bye = send(
        &app,
        Request::post("/logout")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(bye.status, StatusCode::OK);
    assert_eq!(bye.body["message"], "Successfully logged out.");
    assert!(bye.cookie.expect("cleared cookie").contains("Max-Age=0"));

    let after = send(
        &app,
        Request::get("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body, json!({ "error": "Authentication required" }));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    assert_eq!(register(&app, "bob", "s3cret-pass").await.status, StatusCode::OK);
    let again = register(&app, "bob", "another-pass").await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["error"], "A user with that username already exists.");
}

#[tokio::test]
async fn duplicate_username_ignores_case() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    assert_eq!(register(&app, "alice", "s3cret-pass").await.status, StatusCode::OK);
    let shouted = register(&app, "ALICE", "s3cret-pass").await;
    assert_eq!(shouted.status, StatusCode::BAD_REQUEST);
    assert_eq!(shouted.body["error"], "A user with that username already exists.");

    // Login keeps the exact spelling.
    let credentials = json!({ "username": "Alice", "password": "s3cret-pass" });
    let login = send(&app, post("/login", &credentials)).await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn weak_password_is_rejected() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let reply = register(&app, "carol", "12345678").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "This password is entirely numeric.");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;
    register(&app, "dave", "s3cret-pass").await;

    let reply =
        send(&app, post("/login", &json!({ "username": "dave", "password": "nope-nope" }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.cookie.is_none());

    let unknown =
        send(&app, post("/login", &json!({ "username": "nobody", "password": "whatever1" }))).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let reply = send(&app, Request::post("/logout").body(Body::empty()).expect("request")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
}

#[tokio::test]
async fn slice_is_registered_under_its_type() {
    let database =
        Database::builder().url("mem://").session("test", "slice").init().await.expect("db");
    let slice = init(&ApiConfig::default(), &database).expect("identity");
    assert!(slice.downcast::<Identity>().is_some());

    let mut config = ApiConfig::default();
    config.security.identity.jwt.secret = "  ".to_owned();
    assert!(init(&config, &database).is_err());
}
