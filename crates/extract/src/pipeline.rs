use chrono::{Local, NaiveDate};

use shelflife_core::TextToken;

use crate::keywords::{context_window, has_expiration_context};
use crate::parse;
use crate::patterns::DateShape;

/// One regex hit under consideration, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DateCandidate {
    pub raw_match: String,
    pub shape: DateShape,
    /// Byte offset into the concatenated search buffer.
    pub position: usize,
    pub has_nearby_keyword: bool,
}

/// Pick the expiration date out of OCR output, or nothing.
///
/// Token texts are lower-cased and joined with single spaces into one
/// buffer, then scanned shape by shape in declaration order. The first
/// candidate that parses to a valid calendar date strictly after today is
/// accepted; candidates that fail to parse or sit in the past are skipped
/// and the scan continues.
pub fn extract_expiration_date(tokens: &[TextToken]) -> Option<NaiveDate> {
    extract_expiration_date_at(tokens, Local::now().date_naive())
}

/// [`extract_expiration_date`] against an explicit reference date.
pub fn extract_expiration_date_at(tokens: &[TextToken], today: NaiveDate) -> Option<NaiveDate> {
    let buffer = search_buffer(tokens);
    scan_shapes(&buffer, &DateShape::ALL, today)
}

/// Scan free text with every shape. The text is lower-cased internally.
pub fn scan_text_at(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    scan_shapes(&text.to_lowercase(), &DateShape::ALL, today)
}

/// Scan free text with the numeric shapes only. Used on terse oracle
/// replies whose contract is `MM/DD/YYYY`.
pub fn scan_numeric_at(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    scan_shapes(&text.to_lowercase(), &DateShape::NUMERIC, today)
}

fn search_buffer(tokens: &[TextToken]) -> String {
    tokens
        .iter()
        .map(|t| t.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn scan_shapes(buffer: &str, shapes: &[DateShape], today: NaiveDate) -> Option<NaiveDate> {
    for &shape in shapes {
        for m in shape.regex().find_iter(buffer) {
            let candidate = DateCandidate {
                raw_match: m.as_str().to_string(),
                shape,
                position: m.start(),
                has_nearby_keyword: has_expiration_context(context_window(buffer, m.start())),
            };
            match parse::parse(&candidate.raw_match, shape) {
                Ok(date) if date > today => {
                    tracing::debug!(
                        raw = %candidate.raw_match,
                        shape = %shape,
                        position = candidate.position,
                        keyword_nearby = candidate.has_nearby_keyword,
                        %date,
                        "accepted date candidate"
                    );
                    return Some(date);
                }
                Ok(date) => {
                    tracing::debug!(raw = %candidate.raw_match, %date, "skipping non-future date");
                }
                Err(e) => {
                    tracing::debug!(raw = %candidate.raw_match, error = %e, "skipping unparseable candidate");
                }
            }
        }
    }
    None
}
