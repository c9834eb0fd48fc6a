use std::cmp::Ordering;
use std::fmt;

use chrono::{Local, NaiveDate};
use image::DynamicImage;

use shelflife_core::{DateSource, Detection, ExpiryResult, ScanReport};
use shelflife_detect::{crop_region, DetectorBackend, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PADDING};
use shelflife_extract::{extract_expiration_date_at, scan_numeric_at};
use shelflife_ocr::{prepare, TextExtractor};
use shelflife_vision::{
    is_no_date_reply, parse_item_reply, VisionBackend, DATE_PROMPT, IDENTIFY_PROMPT,
};

/// Stages of one scan, in the order they can run. Emitted with every stage
/// log event so a request's path through the pipeline is reconstructable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Detect,
    Crop,
    OcrExtract,
    Accept,
    Escalate,
    Done,
}

impl ScanStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStage::Detect => "detect",
            ScanStage::Crop => "crop",
            ScanStage::OcrExtract => "ocr_extract",
            ScanStage::Accept => "accept",
            ScanStage::Escalate => "escalate",
            ScanStage::Done => "done",
        }
    }
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for one pipeline instance. Injected at construction; nothing is
/// read from the environment here.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Detections below this confidence are not requested from the oracle.
    pub confidence_threshold: f32,
    /// Pixels of slack around the detected box before OCR.
    pub crop_padding: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            crop_padding: DEFAULT_PADDING,
        }
    }
}

/// The fallback orchestrator: detect → crop → OCR date scan, escalating to
/// the generative-vision oracle when the deterministic stages come up empty.
///
/// Every adapter is optional. A missing or failing oracle degrades that
/// stage (detection → full-image crop, OCR → escalate, vision → terminal
/// none) and the scan always reaches a terminal report; the caller sees
/// "no date found", never an error.
pub struct ScanPipeline {
    detector: Option<Box<dyn DetectorBackend>>,
    ocr: Option<TextExtractor>,
    vision: Option<Box<dyn VisionBackend>>,
    config: ScanConfig,
}

impl ScanPipeline {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            detector: None,
            ocr: None,
            vision: None,
            config,
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn DetectorBackend>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_ocr(mut self, ocr: TextExtractor) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_vision(mut self, vision: Box<dyn VisionBackend>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Run one photo through the pipeline against today's date.
    pub fn scan(&self, image_bytes: &[u8]) -> ScanReport {
        self.scan_at(image_bytes, Local::now().date_naive())
    }

    /// [`ScanPipeline::scan`] against an explicit reference date.
    pub fn scan_at(&self, image_bytes: &[u8], today: NaiveDate) -> ScanReport {
        let detections = self.detect(image_bytes);
        let region = self.cropped_region(image_bytes, &detections);

        let expiry = match self.ocr_extract(region.as_deref(), today) {
            Some(date) => {
                tracing::info!(stage = %ScanStage::Accept, %date, "date found by OCR");
                ExpiryResult::found(date, DateSource::Ocr)
            }
            None => self.escalate(image_bytes, today),
        };

        let item = self.identify_item(&detections, image_bytes);
        tracing::info!(
            stage = %ScanStage::Done,
            source = %expiry.source,
            item = item.as_deref().unwrap_or("-"),
            "scan finished"
        );
        ScanReport {
            item,
            detections,
            expiry,
        }
    }

    fn detect(&self, image_bytes: &[u8]) -> Vec<Detection> {
        let Some(detector) = &self.detector else {
            tracing::debug!(stage = %ScanStage::Detect, "no detection oracle configured");
            return Vec::new();
        };
        match detector.detect(image_bytes, self.config.confidence_threshold) {
            Ok(detections) => {
                tracing::info!(stage = %ScanStage::Detect, count = detections.len(), "detection done");
                detections
            }
            Err(e) => {
                tracing::warn!(stage = %ScanStage::Detect, error = %e, "detection failed, continuing without regions");
                Vec::new()
            }
        }
    }

    /// The padded, OCR-ready crop around the best detection, as PNG bytes.
    ///
    /// Zero detections or an undecodable photo fall back to the full image;
    /// a crop with no pixels yields `None` so OCR is skipped outright.
    fn cropped_region(&self, image_bytes: &[u8], detections: &[Detection]) -> Option<Vec<u8>> {
        let img = match image::load_from_memory(image_bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(stage = %ScanStage::Crop, error = %e, "photo did not decode, passing raw bytes through");
                return Some(image_bytes.to_vec());
            }
        };

        let region: DynamicImage = match best_detection(detections) {
            Some(d) => {
                tracing::info!(stage = %ScanStage::Crop, bbox = %d.bounding_box, label = %d.label, "cropping best detection");
                crop_region(&img, d.bounding_box, self.config.crop_padding)
            }
            None => {
                tracing::info!(stage = %ScanStage::Crop, "no regions, using full image");
                img
            }
        };

        if region.width() == 0 || region.height() == 0 {
            tracing::warn!(stage = %ScanStage::Crop, "crop has no pixels, skipping OCR");
            return None;
        }

        match prepare(&region) {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(stage = %ScanStage::Crop, error = %e, "preprocessing failed, passing raw bytes through");
                Some(image_bytes.to_vec())
            }
        }
    }

    fn ocr_extract(&self, region: Option<&[u8]>, today: NaiveDate) -> Option<NaiveDate> {
        let region = region?;
        let Some(extractor) = &self.ocr else {
            tracing::debug!(stage = %ScanStage::OcrExtract, "no OCR oracle configured");
            return None;
        };
        let tokens = match extractor.read(region) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(stage = %ScanStage::OcrExtract, error = %e, "OCR failed, treating as no text");
                return None;
            }
        };
        tracing::info!(stage = %ScanStage::OcrExtract, tokens = tokens.len(), "OCR done");
        extract_expiration_date_at(&tokens, today)
    }

    /// Single escalation attempt against the vision oracle. Any failure,
    /// sentinel, unusable reply, or non-future date terminates as none.
    fn escalate(&self, image_bytes: &[u8], today: NaiveDate) -> ExpiryResult {
        let Some(vision) = &self.vision else {
            tracing::debug!(stage = %ScanStage::Escalate, "no vision oracle configured");
            return ExpiryResult::none();
        };
        tracing::info!(stage = %ScanStage::Escalate, "escalating to vision oracle");
        let reply = match vision.ask(image_bytes, DATE_PROMPT) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(stage = %ScanStage::Escalate, error = %e, "escalation failed");
                return ExpiryResult::none();
            }
        };
        if is_no_date_reply(&reply) {
            tracing::debug!(stage = %ScanStage::Escalate, "vision oracle saw no date");
            return ExpiryResult::none();
        }
        match scan_numeric_at(&reply, today) {
            Some(date) => {
                tracing::info!(stage = %ScanStage::Accept, %date, "date found by vision oracle");
                ExpiryResult::found(date, DateSource::AiFallback)
            }
            None => {
                tracing::debug!(stage = %ScanStage::Escalate, reply = %reply, "vision reply carried no usable date");
                ExpiryResult::none()
            }
        }
    }

    /// Best-effort item label: the top detection, else one vision question.
    /// Never influences the expiry outcome.
    fn identify_item(&self, detections: &[Detection], image_bytes: &[u8]) -> Option<String> {
        if let Some(d) = best_detection(detections) {
            return Some(d.label.clone());
        }
        let vision = self.vision.as_ref()?;
        match vision.ask(image_bytes, IDENTIFY_PROMPT) {
            Ok(reply) => parse_item_reply(&reply),
            Err(e) => {
                tracing::debug!(error = %e, "item identification failed");
                None
            }
        }
    }
}

fn best_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().max_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use shelflife_core::BoundingBox;
    use shelflife_detect::MockDetector;
    use shelflife_ocr::MockOcr;
    use shelflife_vision::MockVision;
    use std::io::Cursor;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(40, 40, |x, _| Luma([(x * 6) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn det(label: &str, confidence: f32, bbox: (u32, u32, u32, u32)) -> Detection {
        Detection::new(
            label,
            confidence,
            BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3).unwrap(),
        )
    }

    fn ocr_with(words: &[(&str, f32)]) -> TextExtractor {
        TextExtractor::new(Box::new(MockOcr::from_words(words)))
    }

    #[test]
    fn ocr_path_accepts_date_and_reports_item() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_detector(Box::new(MockDetector::new(vec![
                det("banana", 0.91, (5, 5, 30, 30)),
                det("cup", 0.62, (0, 0, 10, 10)),
            ])))
            .with_ocr(ocr_with(&[("BEST", 0.9), ("BY", 0.9), ("12/01/2030", 0.9)]))
            .with_vision(Box::new(MockVision::failing("must not be called")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry.date, Some(date(2030, 12, 1)));
        assert_eq!(report.expiry.source, DateSource::Ocr);
        assert_eq!(report.item.as_deref(), Some("banana"));
        assert_eq!(report.detections.len(), 2);
    }

    #[test]
    fn empty_ocr_escalates_to_vision() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_detector(Box::new(MockDetector::new(vec![det(
                "bottle",
                0.8,
                (5, 5, 30, 30),
            )])))
            .with_ocr(ocr_with(&[]))
            .with_vision(Box::new(MockVision::new().with_date_reply("02/14/2031")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry.date, Some(date(2031, 2, 14)));
        assert_eq!(report.expiry.source, DateSource::AiFallback);
        // Item still comes from detection, not the vision oracle.
        assert_eq!(report.item.as_deref(), Some("bottle"));
    }

    #[test]
    fn no_date_sentinel_terminates_as_none() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_ocr(ocr_with(&[("no", 0.9), ("dates", 0.9), ("here", 0.9)]))
            .with_vision(Box::new(MockVision::new().with_date_reply("NO DATE FOUND")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry, ExpiryResult::none());
    }

    #[test]
    fn chatty_vision_reply_without_a_date_is_none() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_vision(Box::new(
                MockVision::new().with_date_reply("It looks like a jar of pickles."),
            ));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry, ExpiryResult::none());
    }

    #[test]
    fn escalated_past_date_is_rejected() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_vision(Box::new(MockVision::new().with_date_reply("01/01/2020")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry, ExpiryResult::none());
    }

    #[test]
    fn bare_pipeline_reaches_terminal_none() {
        let report = ScanPipeline::new(ScanConfig::default()).scan_at(&tiny_png(), today());
        assert_eq!(report.expiry, ExpiryResult::none());
        assert_eq!(report.item, None);
        assert!(report.detections.is_empty());
    }

    #[test]
    fn detector_failure_degrades_to_full_image_ocr() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_detector(Box::new(MockDetector::failing("network down")))
            .with_ocr(ocr_with(&[("exp", 0.9), ("06/30/2029", 0.9)]));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry.date, Some(date(2029, 6, 30)));
        assert_eq!(report.expiry.source, DateSource::Ocr);
        assert!(report.detections.is_empty());
    }

    #[test]
    fn ocr_failure_degrades_to_escalation() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_ocr(TextExtractor::new(Box::new(MockOcr::failing("engine crashed"))))
            .with_vision(Box::new(MockVision::new().with_date_reply("07/04/2033")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry.date, Some(date(2033, 7, 4)));
        assert_eq!(report.expiry.source, DateSource::AiFallback);
    }

    #[test]
    fn vision_failure_after_empty_ocr_is_none() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_ocr(ocr_with(&[]))
            .with_vision(Box::new(MockVision::failing("offline")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry, ExpiryResult::none());
    }

    #[test]
    fn out_of_frame_detection_skips_ocr_and_escalates() {
        // The box misses the 40x40 photo entirely, so the crop is empty and
        // the OCR mock (which would happily return a date) must not run.
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_detector(Box::new(MockDetector::new(vec![det(
                "cake",
                0.9,
                (200, 200, 300, 300),
            )])))
            .with_ocr(ocr_with(&[("12/01/2030", 0.9)]))
            .with_vision(Box::new(MockVision::new().with_date_reply("02/14/2031")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.expiry.date, Some(date(2031, 2, 14)));
        assert_eq!(report.expiry.source, DateSource::AiFallback);
    }

    #[test]
    fn undecodable_photo_still_reaches_ocr() {
        // Raw bytes go straight through to the engine; mocks don't mind.
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_ocr(ocr_with(&[("use", 0.9), ("by", 0.9), ("01/15/2027", 0.9)]));

        let report = pipeline.scan_at(b"not an image", today());
        assert_eq!(report.expiry.date, Some(date(2027, 1, 15)));
    }

    #[test]
    fn item_falls_back_to_vision_when_nothing_detected() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_detector(Box::new(MockDetector::empty()))
            .with_ocr(ocr_with(&[("exp", 0.9), ("12/25/2030", 0.9)]))
            .with_vision(Box::new(MockVision::new().with_item_reply("greek yogurt")));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.item.as_deref(), Some("greek yogurt"));
        // Date still came from OCR; the vision call was only for the item.
        assert_eq!(report.expiry.source, DateSource::Ocr);
    }

    #[test]
    fn unknown_item_reply_maps_to_none() {
        let pipeline = ScanPipeline::new(ScanConfig::default())
            .with_vision(Box::new(
                MockVision::new()
                    .with_date_reply("NO DATE FOUND")
                    .with_item_reply("unknown"),
            ));

        let report = pipeline.scan_at(&tiny_png(), today());
        assert_eq!(report.item, None);
    }

    #[test]
    fn stage_names_for_logs() {
        assert_eq!(ScanStage::Detect.to_string(), "detect");
        assert_eq!(ScanStage::OcrExtract.to_string(), "ocr_extract");
        assert_eq!(ScanStage::Done.to_string(), "done");
    }

    #[test]
    fn default_config_matches_adapter_defaults() {
        let c = ScanConfig::default();
        assert_eq!(c.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(c.crop_padding, DEFAULT_PADDING);
    }
}
