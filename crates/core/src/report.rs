use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::detection::Detection;

/// Which stage of the scan produced the accepted expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Ocr,
    AiFallback,
    None,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Ocr => "ocr",
            DateSource::AiFallback => "ai_fallback",
            DateSource::None => "none",
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one expiration-date extraction request.
///
/// `date` serializes as `"YYYY-MM-DD"` or `null`. A missing date always
/// pairs with `DateSource::None`; callers cannot tell "no date printed"
/// apart from "every oracle failed", which is the intended contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub date: Option<NaiveDate>,
    pub source: DateSource,
}

impl ExpiryResult {
    pub fn found(date: NaiveDate, source: DateSource) -> ExpiryResult {
        ExpiryResult {
            date: Some(date),
            source,
        }
    }

    pub fn none() -> ExpiryResult {
        ExpiryResult {
            date: None,
            source: DateSource::None,
        }
    }
}

/// Everything one scan surfaces to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Best item label, from detection or the vision identify fallback.
    pub item: Option<String>,
    pub detections: Vec<Detection>,
    pub expiry: ExpiryResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn source_display() {
        assert_eq!(DateSource::Ocr.to_string(), "ocr");
        assert_eq!(DateSource::AiFallback.to_string(), "ai_fallback");
        assert_eq!(DateSource::None.to_string(), "none");
    }

    #[test]
    fn expiry_serializes_iso_date_and_source() {
        let r = ExpiryResult::found(date(2031, 2, 14), DateSource::AiFallback);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2031-02-14", "source": "ai_fallback"})
        );
    }

    #[test]
    fn expiry_none_serializes_null_date() {
        let json = serde_json::to_value(ExpiryResult::none()).unwrap();
        assert_eq!(json, serde_json::json!({"date": null, "source": "none"}));
    }

    #[test]
    fn expiry_round_trips() {
        let r = ExpiryResult::found(date(2030, 12, 1), DateSource::Ocr);
        let back: ExpiryResult = serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn report_serializes_detections() {
        let report = ScanReport {
            item: Some("banana".to_string()),
            detections: vec![Detection::new(
                "banana",
                0.91,
                BoundingBox::new(10, 10, 50, 60).unwrap(),
            )],
            expiry: ExpiryResult::none(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["item"], "banana");
        assert_eq!(json["detections"][0]["label"], "banana");
        assert_eq!(json["detections"][0]["is_food_related"], true);
        assert_eq!(json["expiry"]["source"], "none");
    }
}
