use crate::Gallery;
use crate::report_log::ReportEntry;
use crate::repository::{DrawingRecord, LABEL_MAX_CHARS, ReportRecord, truncate_chars};
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, SecondsFormat, Utc};
use scribe_derive::{api_handler, api_model};
use scribe_domain::constants::GALLERY_TAG;
use scribe_identity::AuthUser;
use scribe_kernel::extract::JsonBody;
use scribe_kernel::server::ApiState;
use scribe_kernel::{ApiError, ErrorResponse, safe_nanoid};
use scribe_recognition::data_url::decode_strict;
use scribe_recognition::{CanvasRequest, Recognition};

#[api_model]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    /// `<id>.<ext>`, the name to report against.
    pub filename: String,
    pub id: String,
    pub prediction: String,
}

#[api_model]
pub struct GalleryItem {
    pub id: String,
    /// Media URL of the drawing.
    pub image: String,
    pub prediction: Option<String>,
    pub correct_label: Option<String>,
    /// `%Y-%m-%d %H:%M`, UTC.
    pub created_at: String,
}

#[api_model]
pub struct GalleryResponse {
    pub items: Vec<GalleryItem>,
}

#[api_model]
pub struct ReportRequest {
    /// Any case-insensitive fragment of the drawing's file name.
    pub file: Option<String>,
    pub label: Option<String>,
}

#[api_model]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn display_time(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at).map_or_else(
        |_| created_at.to_owned(),
        |t| t.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[api_handler(
    post,
    path = "/save_canvas",
    request_body = CanvasRequest,
    responses(
        (status = OK, description = "Drawing stored and recognized", body = SaveResponse),
        (status = BAD_REQUEST, description = "Missing or malformed image", body = ErrorResponse),
        (status = UNAUTHORIZED, description = "No valid session", body = ErrorResponse),
    ),
    tag = GALLERY_TAG,
)]
pub async fn save_canvas(
    State(state): State<ApiState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CanvasRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let gallery = state.try_get_slice::<Gallery>()?;
    let recognition = state.try_get_slice::<Recognition>()?;

    let image = req
        .image
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Image data required"))?;
    let url = decode_strict(&image)?;

    let id = safe_nanoid!();
    let filename = format!("{id}.{}", url.extension);
    gallery.drawings.write(&filename, &url.bytes).await?;

    let prediction = match recognition.predict(url.bytes).await {
        Ok(prediction) => prediction,
        Err(e) => {
            if let Err(cleanup) = gallery.drawings.delete(&filename).await {
                tracing::warn!(
                    error = %cleanup,
                    file = %filename,
                    "Failed to remove unusable drawing"
                );
            }
            return Err(e.into());
        },
    };
    let prediction = truncate_chars(&prediction, LABEL_MAX_CHARS);

    let drawing = DrawingRecord {
        key: id.clone(),
        user: user.username,
        image: gallery.drawings.key(&filename),
        prediction: Some(prediction.clone()),
        correct_label: None,
        created_at: now_rfc3339(),
    };
    gallery.repository.create_drawing(&drawing).await?;
    tracing::info!(user = %drawing.user, id = %id, prediction = %prediction, "Drawing saved");

    Ok(Json(SaveResponse {
        success: true,
        message: "Canvas saved".to_owned(),
        filename,
        id,
        prediction,
    }))
}

#[api_handler(
    get,
    path = "/gallery",
    responses(
        (status = OK, description = "The caller's drawings, newest first", body = GalleryResponse),
        (status = UNAUTHORIZED, description = "No valid session", body = ErrorResponse),
    ),
    tag = GALLERY_TAG,
)]
pub async fn gallery(
    State(state): State<ApiState>,
    user: AuthUser,
) -> Result<Json<GalleryResponse>, ApiError> {
    let gallery = state.try_get_slice::<Gallery>()?;
    let drawings = gallery.repository.drawings_of(&user.username).await?;

    let items = drawings
        .into_iter()
        .map(|d| GalleryItem {
            image: state.config.storage.media_url_for(&d.image),
            created_at: display_time(&d.created_at),
            id: d.key,
            prediction: d.prediction,
            correct_label: d.correct_label,
        })
        .collect();

    Ok(Json(GalleryResponse { items }))
}

#[api_handler(
    post,
    path = "/report_canvas",
    request_body = ReportRequest,
    responses(
        (status = OK, description = "Label recorded", body = ReportResponse),
        (
            status = BAD_REQUEST,
            description = "File or label missing, or several drawings match",
            body = ErrorResponse,
        ),
        (status = NOT_FOUND, description = "No matching drawing", body = ErrorResponse),
    ),
    tag = GALLERY_TAG,
)]
pub async fn report_canvas(
    State(state): State<ApiState>,
    user: AuthUser,
    JsonBody(req): JsonBody<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let gallery = state.try_get_slice::<Gallery>()?;

    let (Some(file), Some(label)) =
        (req.file.filter(|f| !f.is_empty()), req.label.filter(|l| !l.is_empty()))
    else {
        return Err(ApiError::bad_request("File and label are required"));
    };

    let mut matches = gallery.repository.matching_file(&user.username, &file).await?;
    if matches.len() > 1 {
        return Err(ApiError::bad_request("More than one drawing matches that file"));
    }
    let drawing = matches.pop().ok_or_else(|| ApiError::not_found("Drawing not found"))?;

    let label = label.to_uppercase();
    gallery.repository.set_correct_label(&drawing.key, &label).await?;

    let timestamp = now_rfc3339();
    gallery
        .repository
        .create_report(&ReportRecord {
            user: user.username.clone(),
            image: drawing.image,
            label: label.clone(),
            created_at: timestamp.clone(),
        })
        .await?;

    gallery.log.append(&ReportEntry { user: user.username, file, label, timestamp }).await?;
    tracing::info!(id = %drawing.key, "Label report saved");

    Ok(Json(ReportResponse { success: true, message: "Report saved".to_owned() }))
}
