use scribe_storage::{Compression, Storage, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

async fn media_store(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path().join("media")).sharding(false).connect().await.unwrap()
}

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;

    assert!(storage.resolve("../etc/passwd").is_err());
    assert!(storage.resolve("drawings/../../secret").is_err());
    assert!(storage.read("/etc/passwd").await.is_err());
}

#[tokio::test]
async fn test_flat_layout_keeps_paths_url_stable() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;

    storage.write("canvas_20260101_120000_a1b2c3.png", b"png").await.unwrap();
    storage.namespace("drawings").unwrap().write("V1StGXR8_Z5j.png", b"png").await.unwrap();

    let root = storage.root().to_path_buf();
    assert!(root.join("canvas_20260101_120000_a1b2c3.png").is_file());
    assert!(root.join("drawings").join("V1StGXR8_Z5j.png").is_file());
    assert_eq!(storage.read("drawings/V1StGXR8_Z5j.png").await.unwrap(), b"png");
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;

    storage.write("a.png", b"first").await.unwrap();
    storage.write("a.png", b"second").await.unwrap();
    assert_eq!(storage.read("a.png").await.unwrap(), b"second");
}

#[tokio::test]
async fn test_compressed_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let payload = vec![7u8; 4096];
    storage.write("bin/data.dat", &payload).await.unwrap();

    assert_eq!(storage.read("bin/data.dat").await.unwrap(), payload);
    assert!(storage.metadata("bin/data.dat").await.unwrap().len() < 4096);
}

#[tokio::test]
async fn test_sharded_namespaces_are_isolated() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let ns_a = storage.namespace("user_a").unwrap();
    let ns_b = storage.namespace("user_b").unwrap();
    ns_a.write("photo.png", b"a").await.unwrap();
    ns_b.write("photo.png", b"b").await.unwrap();

    assert_ne!(ns_a.resolve("photo.png").unwrap(), ns_b.resolve("photo.png").unwrap());
    assert!(ns_a.resolve("photo.png").unwrap().ends_with("user_a/ph/ot/photo.png"));
    assert_eq!(ns_a.read("photo.png").await.unwrap(), b"a");
    assert_eq!(ns_b.read("photo.png").await.unwrap(), b"b");
}

#[tokio::test]
async fn test_delete_and_exists() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;

    storage.write("tmp/file.txt", b"x").await.unwrap();
    assert!(storage.exists("tmp/file.txt").unwrap());

    storage.delete("tmp/file.txt").await.unwrap();
    assert!(!storage.exists("tmp/file.txt").unwrap());

    let err = storage.delete("tmp/file.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;

    let err = storage.read("missing.png").await.expect_err("expected error");
    assert!(matches!(err, StorageError::FileNotFound { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_append_creates_and_extends_log() {
    let temp = TempDir::new().unwrap();
    let storage = media_store(&temp).await;
    let reports = storage.namespace("reports").unwrap();

    reports.append("reports.jsonl", r#"{"label":"HELLO"}"#).await.unwrap();
    reports.append("reports.jsonl", "{\"label\":\"WORLD\"}\n").await.unwrap();

    let text = String::from_utf8(reports.read("reports.jsonl").await.unwrap()).unwrap();
    assert_eq!(text, "{\"label\":\"HELLO\"}\n{\"label\":\"WORLD\"}\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_do_not_interleave() {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(media_store(&temp).await);

    let mut tasks = Vec::new();
    for i in 0..32 {
        let storage = Arc::clone(&storage);
        tasks.push(tokio::spawn(async move {
            let line = format!("{{\"n\":{i},\"pad\":\"{}\"}}", "x".repeat(512));
            storage.append("reports/reports.jsonl", &line).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let text = String::from_utf8(storage.read("reports/reports.jsonl").await.unwrap()).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 32);
    assert!(lines.iter().all(|l| l.starts_with("{\"n\":") && l.ends_with("\"}")));
}

#[tokio::test]
async fn test_append_rejected_on_compressed_store() {
    let temp = TempDir::new().unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let err = storage.append("log.jsonl", "{}").await.unwrap_err();
    assert!(matches!(err, StorageError::Unsupported { .. }));
}

#[tokio::test]
async fn test_connect_without_create_requires_root() {
    let temp = TempDir::new().unwrap();
    let result = Storage::builder().root(temp.path().join("absent")).create(false).connect().await;
    assert!(matches!(result, Err(StorageError::Io { .. })));
}
