use scribe_kernel::ApiError;
use std::borrow::Cow;

#[scribe_derive::scribe_error]
pub enum RecognitionError {
    /// The request carried no usable image.
    #[error("{message}")]
    InvalidImage { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid base64 payload{}: {source}", format_context(.context))]
    Base64 { source: base64::DecodeError, context: Option<Cow<'static, str>> },

    #[error("Cannot decode image{}: {source}", format_context(.context))]
    Image { source: image::ImageError, context: Option<Cow<'static, str>> },

    #[error("Model failure{}: {source}", format_context(.context))]
    Model { source: candle_core::Error, context: Option<Cow<'static, str>> },

    #[error("Internal recognition error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<RecognitionError> for ApiError {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::InvalidImage { message, context } => {
                Self::BadRequest { message, context }
            },
            RecognitionError::Base64 { .. } | RecognitionError::Image { .. } => {
                Self::BadRequest { message: err.to_string().into(), context: None }
            },
            other => Self::Internal {
                message: other.to_string().into(),
                context: Some(other.kind().into()),
            },
        }
    }
}
