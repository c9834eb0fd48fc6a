use shelflife_core::TextToken;

use crate::reader::{OcrBackend, OcrError};

/// Tokens at or below this confidence are noise in practice. Strictly
/// greater-than: a token at exactly the floor is dropped.
pub const MIN_TOKEN_CONFIDENCE: f32 = 0.5;

/// The text-extraction adapter: one OCR engine plus the confidence floor.
///
/// Availability is the caller's concern; a pipeline that could not build an
/// engine holds no `TextExtractor` at all rather than one that always fails.
pub struct TextExtractor {
    backend: Box<dyn OcrBackend>,
    min_confidence: f32,
}

impl TextExtractor {
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self::with_min_confidence(backend, MIN_TOKEN_CONFIDENCE)
    }

    pub fn with_min_confidence(backend: Box<dyn OcrBackend>, min_confidence: f32) -> Self {
        Self {
            backend,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// Run the engine and keep only tokens above the confidence floor.
    pub fn read(&self, image_bytes: &[u8]) -> Result<Vec<TextToken>, OcrError> {
        let tokens = self.backend.read_tokens(image_bytes)?;
        Ok(tokens
            .into_iter()
            .filter(|t| t.confidence > self.min_confidence)
            .collect())
    }
}
