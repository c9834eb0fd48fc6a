use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use thiserror::Error;

use shelflife_core::{BoundingBox, Detection};

/// Oracle-side confidence cut applied when the caller does not override it.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

const DEFAULT_ENDPOINT: &str = "https://detect.roboflow.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
// Oracle-side non-max-suppression overlap, in percent.
const OVERLAP_PERCENT: u32 = 30;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Cannot connect to detection service: {0}")]
    Connection(String),
    #[error("Detection request failed: {0}")]
    Http(String),
    #[error("Detection service returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected detection response: {0}")]
    Response(String),
    #[error("Detection oracle not available: {0}")]
    NotAvailable(String),
}

/// Abstraction over an object detection engine. Implementations accept raw
/// image bytes and a confidence threshold in `[0,1]`, and return regions in
/// the oracle's native order.
pub trait DetectorBackend: Send + Sync {
    fn detect(
        &self,
        image_bytes: &[u8],
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DetectError>;
}

// ── Hosted inference backend ──────────────────────────────────────────────────

/// Connection settings for a hosted detection model.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Base URL of the inference service.
    pub endpoint: String,
    /// Model identifier, e.g. `food-packages`.
    pub model: String,
    /// Published model version.
    pub version: u32,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: String::new(),
            version: 1,
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for a hosted detection API that takes a base64 image body and
/// answers with centered boxes.
pub struct HostedDetector {
    config: DetectorConfig,
    client: reqwest::blocking::Client,
}

impl HostedDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DetectError::NotAvailable(e.to_string()))?;
        let config = DetectorConfig {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { config, client })
    }

    fn infer_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint, self.config.model, self.config.version
        )
    }
}

impl DetectorBackend for HostedDetector {
    fn detect(
        &self,
        image_bytes: &[u8],
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        let confidence_percent = (confidence_threshold.clamp(0.0, 1.0) * 100.0).round() as u32;
        let body = general_purpose::STANDARD.encode(image_bytes);

        let response = self
            .client
            .post(self.infer_url())
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("confidence", &confidence_percent.to_string()),
                ("overlap", &OVERLAP_PERCENT.to_string()),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    DetectError::Connection(e.to_string())
                } else if e.is_timeout() {
                    DetectError::Http(format!(
                        "request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else {
                    DetectError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DetectError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InferenceResponse = response
            .json()
            .map_err(|e| DetectError::Response(e.to_string()))?;
        Ok(to_detections(parsed))
    }
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    predictions: Vec<InferencePrediction>,
}

#[derive(Debug, Deserialize)]
struct InferencePrediction {
    // Box center plus extent, in pixels.
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    confidence: f32,
    #[serde(rename = "class")]
    label: String,
}

fn to_detections(response: InferenceResponse) -> Vec<Detection> {
    response
        .predictions
        .into_iter()
        .filter_map(
            |p| match BoundingBox::from_center(p.x, p.y, p.width, p.height) {
                Some(bbox) => Some(Detection::new(p.label, p.confidence, bbox)),
                None => {
                    tracing::debug!(label = %p.label, "dropping degenerate prediction box");
                    None
                }
            },
        )
        .collect()
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set detection list, or a pre-set failure, regardless of
/// input. The confidence threshold is honored against the canned list.
pub struct MockDetector {
    detections: Vec<Detection>,
    fail: Option<String>,
}

impl MockDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            fail: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            detections: Vec::new(),
            fail: Some(message.into()),
        }
    }
}

impl DetectorBackend for MockDetector {
    fn detect(
        &self,
        _image_bytes: &[u8],
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        match &self.fail {
            Some(msg) => Err(DetectError::Http(msg.clone())),
            None => Ok(self
                .detections
                .iter()
                .filter(|d| d.confidence >= confidence_threshold)
                .cloned()
                .collect()),
        }
    }
}
