//! Parsing of `data:` URLs posted by the canvas client.

use crate::error::RecognitionError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const LOOSE_MARKER: &str = "base64,";
const STRICT_MARKER: &str = ";base64,";

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Last segment of the mime type, e.g. `png` for `image/png`.
    pub extension: String,
    pub bytes: Vec<u8>,
}

fn invalid_format() -> RecognitionError {
    RecognitionError::InvalidImage { message: "Invalid image format".into(), context: None }
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, RecognitionError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Decodes everything after the first `base64,`, ignoring what precedes it.
///
/// # Errors
/// `Invalid image format` when the marker is missing, [`RecognitionError::Base64`]
/// for a corrupt payload.
pub fn decode_loose(url: &str) -> Result<Vec<u8>, RecognitionError> {
    let (_, payload) = url.split_once(LOOSE_MARKER).ok_or_else(invalid_format)?;
    decode_payload(payload)
}

/// Requires exactly one `;base64,` separator and takes the extension from the mime type.
///
/// # Errors
/// `Invalid image format` for a malformed header or an extension that is not plain
/// alphanumeric, [`RecognitionError::Base64`] for a corrupt payload.
pub fn decode_strict(url: &str) -> Result<DataUrl, RecognitionError> {
    let mut parts = url.split(STRICT_MARKER);
    let (Some(header), Some(payload), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid_format());
    };

    let extension = header.rsplit('/').next().unwrap_or_default().to_ascii_lowercase();
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid_format());
    }

    Ok(DataUrl { extension, bytes: decode_payload(payload)? })
}
