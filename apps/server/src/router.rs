use axum::Router;
use scribe::kernel::server::{ApiState, method_not_allowed};
use scribe::server::router::{feature_router, system_router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(info(title = "Scribe", description = "Handwritten word recognition"))]
struct ApiDoc;

/// The full application: API routes, the Scalar UI at `/api`, and the static site as
/// the fallback for everything else.
pub fn init(state: ApiState) -> Router {
    let static_dir = state.config.storage.static_dir.clone();

    // Separate the OpenAPI routes and the API documentation object
    let (api_routes, api_doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(system_router())
        .merge(feature_router())
        .split_for_parts();

    Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/api", api_doc))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
