//! Handwriting recognition slice.
//!
//! A canvas image goes through [`preprocess::prepare`], the [`model::Crnn`] network and
//! [`ctc::greedy_decode`]. The slice owns a shared [`Recognizer`]; other slices reach it
//! through [`Recognition::predict`].

pub mod alphabet;
pub mod ctc;
pub mod data_url;
mod error;
mod handlers;
pub mod model;
pub mod preprocess;
mod recognizer;

pub use error::{RecognitionError, RecognitionErrorExt};
pub use handlers::{CanvasRequest, UploadResponse};
pub use recognizer::{CrnnRecognizer, FixedRecognizer, Recognizer};

use scribe_domain::config::ApiConfig;
use scribe_kernel::domain::registry::InitializedSlice;
use scribe_kernel::server::ApiState;
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Recognition feature state.
#[scribe_derive::scribe_slice]
pub struct Recognition {
    recognizer: Arc<dyn Recognizer>,
}

impl Recognition {
    /// Runs the recognizer on the blocking pool.
    ///
    /// # Errors
    /// Whatever the recognizer reports, or [`RecognitionError::Internal`] if the task panicked.
    pub async fn predict(&self, image: Vec<u8>) -> Result<String, RecognitionError> {
        let recognizer = Arc::clone(&self.recognizer);
        tokio::task::spawn_blocking(move || recognizer.predict(&image))
            .await
            .map_err(|e| RecognitionError::from(format!("Recognition task failed: {e}")))?
    }
}

/// Initialize the recognition feature from `model` config.
///
/// Loads the weights file. When it is absent and `model.allow_missing` is set, the slice
/// falls back to a [`FixedRecognizer`] answering with an empty word.
///
/// # Errors
/// [`RecognitionError::Model`] if the weights are missing (and not allowed to be) or
/// cannot be loaded.
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, RecognitionError> {
    let weights = &config.model.weights;

    let recognizer: Arc<dyn Recognizer> = if weights.is_file() {
        let recognizer = CrnnRecognizer::from_weights(weights)?;
        tracing::info!(weights = %weights.display(), "CRNN weights loaded");
        Arc::new(recognizer)
    } else if config.model.allow_missing {
        tracing::warn!(
            weights = %weights.display(),
            "Model weights not found, predictions will be empty"
        );
        Arc::new(FixedRecognizer::new(""))
    } else {
        return Err(RecognitionError::Model {
            source: candle_core::Error::Msg(format!("weights not found: {}", weights.display())),
            context: Some("model.weights".into()),
        });
    };

    Ok(with_recognizer(recognizer))
}

/// Registers the slice around an existing recognizer.
#[must_use]
pub fn with_recognizer(recognizer: Arc<dyn Recognizer>) -> InitializedSlice {
    tracing::info!("Recognition slice initialized");
    InitializedSlice::new(Recognition::new(RecognitionInner { recognizer }))
}

/// `POST /upload_canvas`.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(handlers::upload_canvas))
}
