use axum::http::header;
use axum::{Json, response::IntoResponse};
use scribe_derive::{api_handler, api_model};
use scribe_domain::constants::SYSTEM_TAG;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Liveness report.
#[api_model]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Seconds since [`mark_started`].
    uptime: u64,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Pins the uptime origin. Call once while the server boots; later calls are no-ops.
pub fn mark_started() {
    LazyLock::force(&START_TIME);
}

/// Time since [`mark_started`], or since the first call if it never ran.
#[must_use]
pub fn uptime() -> Duration {
    START_TIME.elapsed()
}

#[api_handler(
    get,
    path = "/health",
    responses((status = OK, description = "Service is up", body = HealthResponse)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler() -> impl IntoResponse {
    let body = HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
        uptime: uptime().as_secs(),
    };

    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_counts_from_start_mark() {
        mark_started();
        std::thread::sleep(Duration::from_millis(1100));
        mark_started();
        assert!(uptime() >= Duration::from_secs(1));
    }
}
