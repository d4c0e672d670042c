//! Gallery slice: per-user saved drawings, label corrections and media serving.
//!
//! Drawings are written under the `drawings` media namespace and recorded in the
//! `drawing` table. A correction updates the drawing, adds a `report` record and appends
//! a line to the report log.

mod error;
mod handlers;
mod media;
pub mod report_log;
pub mod repository;

pub use error::{GalleryError, GalleryErrorExt};
pub use handlers::{GalleryItem, GalleryResponse, ReportRequest, ReportResponse, SaveResponse};
pub use media::content_type_for;

use crate::report_log::ReportLog;
use crate::repository::GalleryRepository;
use axum::routing::get;
use scribe_database::Database;
use scribe_domain::constants::{DRAWINGS_NAMESPACE, REPORTS_NAMESPACE};
use scribe_kernel::domain::registry::InitializedSlice;
use scribe_kernel::server::ApiState;
use scribe_storage::{NamespacedStorage, Storage};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Gallery feature state.
#[scribe_derive::scribe_slice]
pub struct Gallery {
    pub repository: GalleryRepository,
    /// Saved drawings, `drawings/<id>.<ext>`.
    pub drawings: NamespacedStorage,
    pub log: ReportLog,
}

/// Initialize the gallery feature.
///
/// # Errors
/// Fails if a media namespace name is rejected by the store.
pub fn init(database: &Database, storage: &Storage) -> Result<InitializedSlice, GalleryError> {
    let slice = Gallery::new(GalleryInner {
        repository: GalleryRepository::new(database.clone()),
        drawings: storage.namespace(DRAWINGS_NAMESPACE)?,
        log: ReportLog::new(storage.namespace(REPORTS_NAMESPACE)?),
    });
    tracing::info!("Gallery slice initialized");

    Ok(InitializedSlice::new(slice))
}

/// `POST /save_canvas`, `GET /gallery`, `POST /report_canvas` and `GET /media/{*path}`.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::save_canvas))
        .routes(routes!(handlers::gallery))
        .routes(routes!(handlers::report_canvas))
        .route("/media/{*path}", get(media::media))
}
