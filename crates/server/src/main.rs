use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use shelflife_detect::{DetectorConfig, HostedDetector};
use shelflife_scan::{ScanConfig, ScanPipeline};
use shelflife_vision::{GenerativeVisionClient, VisionConfig};

mod config;
mod routes;

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config = ServerConfig::load(config_path.as_deref().map(Path::new))?;

    let pipeline = Arc::new(build_pipeline(&config));
    let app = routes::router(pipeline, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "shelflife server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Wire up whichever oracles the config names. Each one is optional: a
/// missing section or a failed client build leaves that adapter out and the
/// pipeline degrades per stage instead of refusing to start.
fn build_pipeline(config: &ServerConfig) -> ScanPipeline {
    let mut pipeline = ScanPipeline::new(ScanConfig::default());

    if let Some(settings) = &config.detector {
        let mut detector_config = DetectorConfig {
            model: settings.model.clone(),
            version: settings.version,
            api_key: settings.api_key.clone(),
            ..DetectorConfig::default()
        };
        if let Some(endpoint) = &settings.endpoint {
            detector_config.endpoint = endpoint.clone();
        }
        match HostedDetector::new(detector_config) {
            Ok(detector) => pipeline = pipeline.with_detector(Box::new(detector)),
            Err(e) => tracing::warn!(error = %e, "detection oracle unavailable"),
        }
    } else {
        tracing::info!("no detection oracle configured, scans use the full image");
    }

    pipeline = attach_ocr(pipeline, config);

    if let Some(settings) = &config.vision {
        let mut vision_config = VisionConfig {
            api_key: settings.api_key.clone(),
            ..VisionConfig::default()
        };
        if let Some(model) = &settings.model {
            vision_config.model = model.clone();
        }
        if let Some(endpoint) = &settings.endpoint {
            vision_config.endpoint = endpoint.clone();
        }
        match GenerativeVisionClient::new(vision_config) {
            Ok(vision) => pipeline = pipeline.with_vision(Box::new(vision)),
            Err(e) => tracing::warn!(error = %e, "vision oracle unavailable"),
        }
    } else {
        tracing::info!("no vision oracle configured, scans cannot escalate");
    }

    pipeline
}

#[cfg(feature = "tesseract")]
fn attach_ocr(pipeline: ScanPipeline, config: &ServerConfig) -> ScanPipeline {
    use shelflife_ocr::{TesseractReader, TextExtractor};

    if !config.ocr.enabled {
        tracing::info!("OCR disabled by config");
        return pipeline;
    }
    let reader = TesseractReader::new(config.ocr.data_path.clone(), &config.ocr.lang);
    pipeline.with_ocr(TextExtractor::new(Box::new(reader)))
}

#[cfg(not(feature = "tesseract"))]
fn attach_ocr(pipeline: ScanPipeline, config: &ServerConfig) -> ScanPipeline {
    if config.ocr.enabled {
        tracing::warn!("OCR enabled in config but the tesseract feature is not compiled in");
    }
    pipeline
}
