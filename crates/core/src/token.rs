use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;

/// One unit of recognized text from the OCR oracle, with the engine's
/// confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    pub text: String,
    pub confidence: f32,
    /// Where the token sat in the source image, when the engine reports it.
    pub region: Option<BoundingBox>,
}

impl TextToken {
    pub fn new(text: impl Into<String>, confidence: f32) -> TextToken {
        TextToken {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            region: None,
        }
    }

    pub fn with_region(text: impl Into<String>, confidence: f32, region: BoundingBox) -> TextToken {
        TextToken {
            region: Some(region),
            ..TextToken::new(text, confidence)
        }
    }
}
