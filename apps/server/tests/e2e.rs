use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbImage};
use scribe::domain::config::ApiConfig;
use scribe::features::{gallery, identity, recognition};
use scribe::kernel::server::ApiState;
use scribe_database::Database;
use scribe_server::Server;
use scribe_storage::Storage;
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const INDEX: &str = "<!doctype html><title>Scribe</title>";

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

async fn app(tmp: &TempDir) -> Router {
    let static_dir = tmp.path().join("public");
    std::fs::create_dir_all(&static_dir).expect("static dir");
    std::fs::write(static_dir.join("index.html"), INDEX).expect("index");

    let mut config = ApiConfig::default();
    config.storage.data_dir = tmp.path().join("media");
    config.storage.static_dir = static_dir;

    let database =
        Database::builder().url("mem://").session("test", "e2e").init().await.expect("db");
    let storage = Storage::builder()
        .root(&config.storage.data_dir)
        .sharding(false)
        .connect()
        .await
        .expect("storage");

    let state = ApiState::builder()
        .register_slice(identity::init(&config, &database).expect("identity"))
        .register_slice(recognition::with_recognizer(Arc::new(
            recognition::FixedRecognizer::new("HELLO"),
        )))
        .register_slice(gallery::init(&database, &storage).expect("gallery"))
        .config(config)
        .db(database)
        .storage(storage)
        .build()
        .expect("state");

    scribe_server::app(state)
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body").to_vec();
    Reply { status, cookie, body }
}

fn post(path: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn png_url() -> String {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::from_pixel(256, 64, image::Rgb([255, 255, 255]))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode");
    format!("data:image/png;base64,{}", STANDARD.encode(buf.into_inner()))
}

#[tokio::test]
async fn health_and_index() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let reply = send(&app, get("/health", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "up");

    let reply = send(&app, get("/", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(String::from_utf8_lossy(&reply.body), INDEX);
}

#[tokio::test]
async fn wrong_method_is_a_json_400() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    for path in ["/upload_canvas", "/save_canvas", "/report_canvas", "/logout"] {
        let reply = send(&app, get(path, None)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(reply.json(), json!({ "error": "Only POST allowed" }), "{path}");
    }
}

#[tokio::test]
async fn guest_upload_is_recognized_and_served() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let reply = send(&app, post("/upload_canvas", None, &json!({ "image": png_url() }))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["prediction"], "HELLO");

    let url = body["file_url"].as_str().expect("file_url");
    assert!(url.starts_with("/media/canvas_"), "{url}");
    let image = send(&app, get(url, None)).await;
    assert_eq!(image.status, StatusCode::OK);
    assert!(image.body.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn malformed_json_is_a_json_400() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let request = Request::post("/upload_canvas")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["error"].is_string());
}

#[tokio::test]
async fn account_gallery_and_report_flow() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let app = app(&tmp).await;

    let account = json!({
        "username": "alice",
        "password": "s3cret-pass",
        "password_confirm": "s3cret-pass",
    });
    let reply = send(&app, post("/register", None, &account)).await;
    assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.json());

    let credentials = json!({ "username": "alice", "password": "s3cret-pass" });
    let login = send(&app, post("/login", None, &credentials)).await;
    assert_eq!(login.status, StatusCode::OK);
    let cookie = login.cookie.expect("session cookie");
    assert!(cookie.starts_with("scribe_session="));

    let anonymous = send(&app, get("/gallery", None)).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let saved = send(&app, post("/save_canvas", Some(&cookie), &json!({ "image": png_url() })))
        .await
        .json();
    assert_eq!(saved["prediction"], "HELLO");
    let filename = saved["filename"].as_str().expect("filename").to_owned();

    let listing = send(&app, get("/gallery", Some(&cookie))).await.json();
    let items = listing["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    let image_url = items[0]["image"].as_str().expect("image url");
    assert_eq!(send(&app, get(image_url, None)).await.status, StatusCode::OK);

    let report = json!({ "file": filename, "label": "world" });
    let reply = send(&app, post("/report_canvas", Some(&cookie), &report)).await;
    assert_eq!(reply.json(), json!({ "success": true, "message": "Report saved" }));

    let listing = send(&app, get("/gallery", Some(&cookie))).await.json();
    assert_eq!(listing["items"][0]["correct_label"], "WORLD");

    let log = tmp.path().join("media").join("reports").join("reports.jsonl");
    let line = std::fs::read_to_string(log).expect("report log");
    assert_eq!(line.lines().count(), 1);
    assert!(line.contains("\"label\":\"WORLD\""));

    let logout = send(&app, post("/logout", Some(&cookie), &json!({}))).await;
    assert_eq!(logout.json()["message"], "Successfully logged out.");
    let after = send(&app, get("/gallery", Some(&cookie))).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn builder_starts_with_placeholder_model() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let mut config = ApiConfig::default();
    config.storage.data_dir = tmp.path().join("media");
    config.model.weights = tmp.path().join("absent.safetensors");
    config.model.allow_missing = true;

    let server = Server::builder().config(config).port(0).build().await.expect("server");
    assert_eq!(server.state().slice_ids().count(), 3);
    let booted = scribe::kernel::server::uptime();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(scribe::kernel::server::uptime() > booted);
    assert!(tmp.path().join("media").is_dir());

    let reply = send(&server.router(), post("/upload_canvas", None, &json!({ "image": png_url() })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["prediction"], "");
}

#[tokio::test]
async fn builder_refuses_missing_weights() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let mut config = ApiConfig::default();
    config.storage.data_dir = tmp.path().join("media");
    config.model.weights = tmp.path().join("absent.safetensors");

    assert!(Server::builder().config(config).build().await.is_err());
}
