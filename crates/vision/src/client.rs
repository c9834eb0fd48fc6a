use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instruction for the date-extraction escalation. The reply contract is a
/// bare `MM/DD/YYYY` or the no-date sentinel.
pub const DATE_PROMPT: &str = "Look for an expiration date, best by date, or use by date in this image. Respond with ONLY the date in format MM/DD/YYYY. If no date is found, respond with \"NO DATE FOUND\".";

/// Instruction for the item-identification fallback.
pub const IDENTIFY_PROMPT: &str = "Identify the main food item in this image. Respond with ONLY the food name in 1-3 words. If you cannot identify a food item, respond with \"unknown\".";

/// Substring of the reply that means "no date on this package". Checked
/// case-insensitively and by containment, since models pad their answers.
pub const NO_DATE_SENTINEL: &str = "NO DATE";

/// Reply meaning the model could not name the item.
pub const UNKNOWN_SENTINEL: &str = "unknown";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Cannot connect to vision service: {0}")]
    Connection(String),
    #[error("Vision request failed: {0}")]
    Http(String),
    #[error("Vision service returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected vision response: {0}")]
    Response(String),
    #[error("Vision oracle not available: {0}")]
    NotAvailable(String),
    #[error("Vision reply carried no text")]
    EmptyReply,
}

/// Abstraction over a generative vision-language oracle: one image, one
/// short instruction, one short free-text reply.
pub trait VisionBackend: Send + Sync {
    fn ask(&self, image_bytes: &[u8], prompt: &str) -> Result<String, VisionError>;
}

// ── Reply interpretation ──────────────────────────────────────────────────────

/// True when the model says there is no date on the package.
pub fn is_no_date_reply(reply: &str) -> bool {
    reply.to_uppercase().contains(NO_DATE_SENTINEL)
}

/// Interpret an identify reply. Sentinel, empty, and overlong replies all
/// mean the model does not know.
pub fn parse_item_reply(reply: &str) -> Option<String> {
    let cleaned = reply.trim().trim_matches('"').trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(UNKNOWN_SENTINEL) {
        return None;
    }
    if cleaned.split_whitespace().count() > 3 {
        return None;
    }
    Some(cleaned.to_lowercase())
}

// ── Hosted generative client ──────────────────────────────────────────────────

/// Connection settings for the generative-vision service.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for a generateContent-style vision API carrying the image inline
/// as base64.
pub struct GenerativeVisionClient {
    config: VisionConfig,
    client: reqwest::blocking::Client,
}

impl GenerativeVisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::NotAvailable(e.to_string()))?;
        let config = VisionConfig {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { config, client })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, self.config.model
        )
    }
}

impl VisionBackend for GenerativeVisionClient {
    fn ask(&self, image_bytes: &[u8], prompt: &str) -> Result<String, VisionError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: mime_type_for(image_bytes).to_string(),
                            data: general_purpose::STANDARD.encode(image_bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    VisionError::Connection(e.to_string())
                } else if e.is_timeout() {
                    VisionError::Http(format!(
                        "request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else {
                    VisionError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| VisionError::Response(e.to_string()))?;
        reply_text(parsed)
    }
}

/// Pick the transport mime type from the leading magic bytes.
fn mime_type_for(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"\xFF\xD8") {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn reply_text(response: GenerateResponse) -> Result<String, VisionError> {
    let text = response
        .candidates
        .into_iter()
        .flat_map(|c| c.content.map(|c| c.parts).unwrap_or_default())
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim().to_string();
    if text.is_empty() {
        Err(VisionError::EmptyReply)
    } else {
        Ok(text)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Replies with pre-set text per prompt, or a pre-set failure.
#[derive(Default)]
pub struct MockVision {
    date_reply: Option<String>,
    item_reply: Option<String>,
    fail: Option<String>,
}

impl MockVision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_reply(mut self, reply: impl Into<String>) -> Self {
        self.date_reply = Some(reply.into());
        self
    }

    pub fn with_item_reply(mut self, reply: impl Into<String>) -> Self {
        self.item_reply = Some(reply.into());
        self
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail: Some(message.into()),
            ..Self::default()
        }
    }
}

impl VisionBackend for MockVision {
    fn ask(&self, _image_bytes: &[u8], prompt: &str) -> Result<String, VisionError> {
        if let Some(msg) = &self.fail {
            return Err(VisionError::Http(msg.clone()));
        }
        let reply = if prompt == DATE_PROMPT {
            &self.date_reply
        } else {
            &self.item_reply
        };
        reply.clone().ok_or(VisionError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_date_sentinel_matches_loosely() {
        assert!(is_no_date_reply("NO DATE FOUND"));
        assert!(is_no_date_reply("no date found"));
        assert!(is_no_date_reply("Sorry, there is no date visible."));
        assert!(!is_no_date_reply("12/25/2030"));
    }

    #[test]
    fn item_reply_trims_and_lowercases() {
        assert_eq!(parse_item_reply(" Banana \n"), Some("banana".to_string()));
        assert_eq!(
            parse_item_reply("\"Greek Yogurt\""),
            Some("greek yogurt".to_string())
        );
    }

    #[test]
    fn item_reply_sentinel_and_chatter_mean_unknown() {
        assert_eq!(parse_item_reply("unknown"), None);
        assert_eq!(parse_item_reply("Unknown"), None);
        assert_eq!(parse_item_reply(""), None);
        assert_eq!(
            parse_item_reply("I think this might be a jar of tomato sauce"),
            None
        );
    }

    #[test]
    fn reply_text_takes_candidate_parts() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "02/14/2031"}], "role": "model"}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply_text(parsed).unwrap(), "02/14/2031");
    }

    #[test]
    fn reply_text_joins_split_parts() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "NO DATE"}, {"text": "FOUND"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply_text(parsed).unwrap(), "NO DATE FOUND");
    }

    #[test]
    fn empty_candidates_is_an_empty_reply() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(reply_text(parsed), Err(VisionError::EmptyReply)));
    }

    #[test]
    fn request_serializes_text_then_image() {
        let req = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: "prompt".to_string(),
                    },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "QUJD".to_string(),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
    }

    #[test]
    fn mime_sniffing() {
        assert_eq!(mime_type_for(b"\x89PNG\r\n\x1a\n...."), "image/png");
        assert_eq!(mime_type_for(b"\xFF\xD8\xFF\xE0...."), "image/jpeg");
        assert_eq!(mime_type_for(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(mime_type_for(b"plain"), "image/png");
    }

    #[test]
    fn generate_url_includes_model() {
        let c = GenerativeVisionClient::new(VisionConfig {
            endpoint: "https://vision.example.com/".to_string(),
            model: "flash-mini".to_string(),
            api_key: "k".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            c.generate_url(),
            "https://vision.example.com/v1beta/models/flash-mini:generateContent"
        );
    }

    #[test]
    fn mock_routes_by_prompt() {
        let v = MockVision::new()
            .with_date_reply("02/14/2031")
            .with_item_reply("banana");
        assert_eq!(v.ask(b"img", DATE_PROMPT).unwrap(), "02/14/2031");
        assert_eq!(v.ask(b"img", IDENTIFY_PROMPT).unwrap(), "banana");
    }

    #[test]
    fn mock_without_reply_is_empty() {
        let v = MockVision::new();
        assert!(matches!(
            v.ask(b"img", DATE_PROMPT),
            Err(VisionError::EmptyReply)
        ));
    }

    #[test]
    fn failing_mock_errors_on_every_prompt() {
        let v = MockVision::failing("offline");
        assert!(v.ask(b"img", DATE_PROMPT).is_err());
        assert!(v.ask(b"img", IDENTIFY_PROMPT).is_err());
    }
}
