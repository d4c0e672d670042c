use scribe_database::DatabaseError;
use scribe_kernel::ApiError;
use scribe_storage::StorageError;
use std::borrow::Cow;

#[scribe_derive::scribe_error]
pub enum GalleryError {
    #[error("Gallery storage error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Media error{}: {source}", format_context(.context))]
    Media { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Report log error{}: {source}", format_context(.context))]
    Serialize { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal gallery error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::Database { source, .. } => source.into(),
            GalleryError::Media { source, .. } => source.into(),
            other => Self::Internal {
                message: other.to_string().into(),
                context: Some(other.kind().into()),
            },
        }
    }
}
