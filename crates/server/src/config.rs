use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_BIND: &str = "127.0.0.1:8420";
// Phone photos; anything larger than this is not a package snapshot.
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Everything the binary reads from the outside world. Loaded once at
/// startup and turned into plain structs for the inner crates; nothing
/// below the binary touches files or environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_body_bytes: usize,
    pub detector: Option<DetectorSettings>,
    pub vision: Option<VisionSettings>,
    pub ocr: OcrSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.parse().expect("default bind address"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            detector: None,
            vision: None,
            ocr: OcrSettings::default(),
        }
    }
}

/// `[detector]` section: hosted detection model coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSettings {
    pub model: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

fn default_version() -> u32 {
    1
}

/// `[vision]` section: generative-vision oracle coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

/// `[ocr]` section. OCR runs in-process, so this is just an on/off switch
/// plus engine data location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub enabled: bool,
    pub data_path: Option<String>,
    pub lang: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            data_path: None,
            lang: "eng".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read the TOML config file, falling back to defaults when no path is
    /// given. API keys may also arrive via `SHELFLIFE_DETECT_API_KEY` /
    /// `SHELFLIFE_VISION_API_KEY`, which override the file.
    pub fn load(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => ServerConfig::default(),
        };

        if let Ok(key) = std::env::var("SHELFLIFE_DETECT_API_KEY") {
            if let Some(detector) = &mut config.detector {
                detector.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("SHELFLIFE_VISION_API_KEY") {
            if let Some(vision) = &mut config.vision {
                vision.api_key = key;
            }
        }
        Ok(config)
    }
}
