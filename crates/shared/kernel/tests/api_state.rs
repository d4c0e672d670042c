use scribe_database::Database;
use scribe_domain::config::ApiConfig;
use scribe_domain::registry::{FeatureSlice, InitializedSlice};
use scribe_kernel::server::{ApiState, ApiStateError};
use scribe_storage::Storage;
use std::any::Any;

#[derive(Debug)]
struct Marker(&'static str);

impl FeatureSlice for Marker {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn builder_requires_every_dependency() {
    let err = ApiState::builder().config(ApiConfig::default()).build().unwrap_err();
    assert!(matches!(err, ApiStateError::Validation { .. }));
}

#[tokio::test]
async fn registered_slices_are_retrievable_by_type() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let database =
        Database::builder().url("mem://").session("test", "state").init().await.expect("db");
    let storage = Storage::builder().root(tmp.path()).sharding(false).connect().await.expect("fs");

    let state = ApiState::builder()
        .config(ApiConfig::default())
        .db(database)
        .storage(storage)
        .register_slice(InitializedSlice::new(Marker("gallery")))
        .build()
        .expect("state");

    assert_eq!(state.try_get_slice::<Marker>().expect("registered").0, "gallery");
    assert_eq!(state.slice_ids().count(), 1);
}
