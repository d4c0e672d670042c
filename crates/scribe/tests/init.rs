use scribe::domain::config::ApiConfig;
use scribe::features::{gallery, identity, recognition};
use scribe_database::Database;
use scribe_storage::Storage;
use std::any::TypeId;

#[tokio::test]
async fn init_builds_every_slice() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let database =
        Database::builder().url("mem://").session("test", "facade").init().await.expect("db");
    let storage =
        Storage::builder().root(tmp.path()).sharding(false).connect().await.expect("storage");

    let mut config = ApiConfig::default();
    config.model.weights = tmp.path().join("absent.safetensors");
    config.model.allow_missing = true;

    let slices = scribe::init(&config, &database, &storage).expect("init");
    let ids: Vec<_> = slices.iter().map(|s| s.id).collect();
    assert_eq!(
        ids,
        [
            TypeId::of::<identity::Identity>(),
            TypeId::of::<recognition::Recognition>(),
            TypeId::of::<gallery::Gallery>(),
        ]
    );
    assert!(scribe::features::is_enabled("gallery"));
    assert!(!scribe::features::is_enabled("licensing"));
}

#[tokio::test]
async fn init_fails_without_weights() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let database =
        Database::builder().url("mem://").session("test", "facade").init().await.expect("db");
    let storage =
        Storage::builder().root(tmp.path()).sharding(false).connect().await.expect("storage");

    let mut config = ApiConfig::default();
    config.model.weights = tmp.path().join("absent.safetensors");

    assert!(scribe::init(&config, &database, &storage).is_err());
}
