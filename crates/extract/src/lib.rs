pub mod keywords;
pub mod parse;
pub mod patterns;
pub mod pipeline;

pub use parse::{parse, DateParseError};
pub use patterns::DateShape;
pub use pipeline::{
    extract_expiration_date, extract_expiration_date_at, scan_numeric_at, scan_text_at,
    DateCandidate,
};
