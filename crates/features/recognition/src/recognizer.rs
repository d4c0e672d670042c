use crate::ctc::greedy_decode;
use crate::error::RecognitionError;
use crate::model::Crnn;
use crate::preprocess::prepare;
use candle_core::Device;
use std::fmt::Debug;
use std::path::Path;

/// Image bytes in, predicted word out.
///
/// Implementations are synchronous and CPU bound; callers run them on the blocking pool.
pub trait Recognizer: Debug + Send + Sync {
    /// # Errors
    /// Fails when the image cannot be decoded or inference fails.
    fn predict(&self, image: &[u8]) -> Result<String, RecognitionError>;
}

/// The trained CRNN with greedy CTC decoding.
#[derive(Debug)]
pub struct CrnnRecognizer {
    model: Crnn,
}

impl CrnnRecognizer {
    #[must_use]
    pub const fn new(model: Crnn) -> Self {
        Self { model }
    }

    /// Loads the safetensors weights at `path` onto the CPU.
    ///
    /// # Errors
    /// See [`Crnn::load`].
    pub fn from_weights(path: &Path) -> Result<Self, RecognitionError> {
        Ok(Self::new(Crnn::load(path, &Device::Cpu)?))
    }
}

impl Recognizer for CrnnRecognizer {
    fn predict(&self, image: &[u8]) -> Result<String, RecognitionError> {
        let plane = prepare(image)?;
        let probabilities = self.model.forward(&plane)?;
        Ok(greedy_decode(&probabilities))
    }
}

/// Validates the image like the real model, then answers with a fixed word.
///
/// Stands in when no weights are deployed and in tests.
#[derive(Debug, Clone)]
pub struct FixedRecognizer {
    answer: String,
}

impl FixedRecognizer {
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }
}

impl Recognizer for FixedRecognizer {
    fn predict(&self, image: &[u8]) -> Result<String, RecognitionError> {
        prepare(image)?;
        Ok(self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarBuilder;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn blank_png() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(300, 80).write_to(&mut buf, ImageFormat::Png).expect("encode");
        buf.into_inner()
    }

    #[test]
    fn test_fixed_recognizer_still_rejects_garbage() {
        let recognizer = FixedRecognizer::new("HELLO");
        assert_eq!(recognizer.predict(&blank_png()).expect("predict"), "HELLO");
        assert!(recognizer.predict(b"garbage").is_err());
    }

    #[test]
    fn test_crnn_recognizer_runs_end_to_end() {
        let model = Crnn::new(&VarBuilder::zeros(DType::F32, &Device::Cpu)).expect("model");
        let prediction = CrnnRecognizer::new(model).predict(&blank_png()).expect("predict");
        assert_eq!(prediction, "A");
    }
}
