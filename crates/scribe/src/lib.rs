//! Facade crate for Scribe features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Call [`init`] once the database and media store are up to build every feature slice.
//! - Merge [`server::router::feature_router`] into the application router.

use scribe_database::Database;
pub use scribe_domain as domain;
use scribe_domain::config::ApiConfig;
use scribe_domain::registry::InitializedSlice;
pub use scribe_kernel as kernel;
use scribe_storage::Storage;

pub mod server {
    pub mod router {
        use scribe_kernel::server::ApiState;
        pub use scribe_kernel::server::system_router;
        use utoipa_axum::router::OpenApiRouter;

        /// Every feature route, ready to merge into the application router.
        pub fn feature_router() -> OpenApiRouter<ApiState> {
            OpenApiRouter::new()
                .merge(crate::features::identity::router())
                .merge(crate::features::recognition::router())
                .merge(crate::features::gallery::router())
        }
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use scribe_gallery as gallery;
    pub use scribe_identity as identity;
    pub use scribe_recognition as recognition;

    /// Slices built by [`crate::init`], in initialization order.
    pub const ENABLED: &[&str] = &["identity", "recognition", "gallery"];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all feature slices.
///
/// # Errors
/// Returns an error if any feature initialization fails, e.g. missing model weights.
pub fn init(
    config: &ApiConfig,
    database: &Database,
    storage: &Storage,
) -> Result<Vec<InitializedSlice>, Box<dyn std::error::Error + Send + Sync>> {
    let mut slices = Vec::new();

    // Accounts and sessions
    slices.push(features::identity::init(config, database)?);

    // Model
    slices.push(features::recognition::init(config)?);

    // Saved drawings and reports (uses the two above at request time)
    slices.push(features::gallery::init(database, storage)?);

    Ok(slices)
}
