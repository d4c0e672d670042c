use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::response::IntoResponse;
use scribe_domain::constants::DRAWINGS_NAMESPACE;
use scribe_kernel::ApiError;
use scribe_kernel::server::ApiState;

/// Content type for a stored media file, by extension.
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Only saved drawings and flat guest uploads are public. Everything else under the
/// media root, the report log included, stays private.
fn is_public(path: &str) -> bool {
    match path.split_once('/') {
        None => !path.is_empty(),
        Some((namespace, rest)) => namespace == DRAWINGS_NAMESPACE && !rest.contains('/'),
    }
}

/// `GET /media/{*path}`: a public file from the sandboxed media root.
#[tracing::instrument(name = "media", skip_all)]
pub(crate) async fn media(
    State(state): State<ApiState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_public(&path) {
        return Err(ApiError::not_found("File not found"));
    }
    let bytes = state.storage.read(&path).await?;

    Ok((
        [
            (CONTENT_TYPE, content_type_for(&path)),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (CACHE_CONTROL, "private, max-age=3600"),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("drawings/a.PNG"), "image/png");
        assert_eq!(content_type_for("b.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(content_type_for("reports/reports.jsonl"), "application/octet-stream");
    }

    #[test]
    fn test_only_drawings_and_guest_files_are_public() {
        assert!(is_public("canvas_20260101_000000_abcdef.png"));
        assert!(is_public("drawings/abc.png"));
        assert!(!is_public("reports/reports.jsonl"));
        assert!(!is_public("drawings/nested/abc.png"));
        assert!(!is_public(""));
    }
}
