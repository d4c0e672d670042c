use crate::Recognition;
use crate::data_url::decode_loose;
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use scribe_derive::{api_handler, api_model};
use scribe_domain::constants::RECOGNITION_TAG;
use scribe_kernel::extract::JsonBody;
use scribe_kernel::server::ApiState;
use scribe_kernel::{ApiError, ErrorResponse};

/// Canvas snapshot as a `data:` URL.
#[api_model]
pub struct CanvasRequest {
    pub image: Option<String>,
}

#[api_model]
pub struct UploadResponse {
    pub prediction: String,
    /// Stored file name, relative to the media root.
    pub file: String,
    pub file_url: String,
}

/// `canvas_<UTC timestamp>_<6 hex chars>.png`
pub(crate) fn guest_file_name(now: DateTime<Utc>) -> Result<String, ApiError> {
    let mut salt = [0u8; 3];
    getrandom::fill(&mut salt).map_err(|e| ApiError::from(format!("Entropy source failed: {e}")))?;
    Ok(format!("canvas_{}_{}.png", now.format("%Y%m%d_%H%M%S"), hex::encode(salt)))
}

#[api_handler(
    post,
    path = "/upload_canvas",
    request_body = CanvasRequest,
    responses(
        (status = OK, description = "Prediction for the uploaded canvas", body = UploadResponse),
        (status = BAD_REQUEST, description = "Missing or undecodable image", body = ErrorResponse),
    ),
    tag = RECOGNITION_TAG,
)]
pub async fn upload_canvas(
    State(state): State<ApiState>,
    JsonBody(req): JsonBody<CanvasRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let image = req
        .image
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("No image received"))?;
    let bytes = decode_loose(&image)?;

    let file = guest_file_name(Utc::now())?;
    state.storage.write(&file, &bytes).await?;

    let recognition = state.try_get_slice::<Recognition>()?;
    let prediction = recognition.predict(bytes).await?;
    tracing::info!(file = %file, prediction = %prediction, "Guest canvas recognized");

    Ok(Json(UploadResponse {
        prediction,
        file_url: state.config.storage.media_url_for(&file),
        file,
    }))
}
