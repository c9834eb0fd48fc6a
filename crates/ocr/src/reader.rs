use shelflife_core::TextToken;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
}

/// Abstraction over a text recognition engine.
/// Implementations accept raw PNG/JPEG image bytes and return every token
/// the engine saw, with confidences; filtering is the adapter's job.
pub trait OcrBackend: Send + Sync {
    fn read_tokens(&self, image_bytes: &[u8]) -> Result<Vec<TextToken>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set token list, or a pre-set failure, regardless of input.
pub struct MockOcr {
    tokens: Vec<TextToken>,
    fail: Option<String>,
}

impl MockOcr {
    pub fn new(tokens: Vec<TextToken>) -> Self {
        Self { tokens, fail: None }
    }

    pub fn from_words(words: &[(&str, f32)]) -> Self {
        Self::new(
            words
                .iter()
                .map(|(text, conf)| TextToken::new(*text, *conf))
                .collect(),
        )
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            tokens: Vec::new(),
            fail: Some(message.into()),
        }
    }
}

impl OcrBackend for MockOcr {
    fn read_tokens(&self, _image_bytes: &[u8]) -> Result<Vec<TextToken>, OcrError> {
        match &self.fail {
            Some(msg) => Err(OcrError::Engine(msg.clone())),
            None => Ok(self.tokens.clone()),
        }
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::LepTess;
    use shelflife_core::TextToken;

    pub struct TesseractReader {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractReader {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self {
                data_path,
                lang: lang.to_string(),
            }
        }
    }

    impl OcrBackend for TesseractReader {
        fn read_tokens(&self, image_bytes: &[u8]) -> Result<Vec<TextToken>, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::NotAvailable(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let text = lt
                .get_utf8_text()
                .map_err(|e| OcrError::Engine(e.to_string()))?;

            // Tesseract reports one confidence per page cheaply; line-level
            // tokens with the page confidence are enough for the date scan.
            let confidence = (lt.mean_text_conf() as f32 / 100.0).clamp(0.0, 1.0);
            Ok(text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| TextToken::new(line, confidence))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_tokens() {
        let r = MockOcr::from_words(&[("EXP", 0.9), ("12/25/2030", 0.8)]);
        let tokens = r.read_tokens(b"fake image data").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "EXP");
        assert_eq!(tokens[1].confidence, 0.8);
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockOcr::from_words(&[("hello", 1.0)]);
        assert_eq!(r.read_tokens(b"anything").unwrap().len(), 1);
        assert_eq!(r.read_tokens(b"").unwrap().len(), 1);
    }

    #[test]
    fn failing_mock_reports_engine_error() {
        let r = MockOcr::failing("engine crashed");
        let err = r.read_tokens(b"img").unwrap_err();
        assert!(matches!(err, OcrError::Engine(_)));
        assert_eq!(err.to_string(), "OCR engine error: engine crashed");
    }
}
