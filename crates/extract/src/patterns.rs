use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// ── Date shapes ──────────────────────────────────────────────────────────────

re!(re_numeric_ymd, r"(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})");
re!(re_numeric_generic, r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})");
re!(
    re_month_name,
    r"(?i)(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{1,2})[,\s]+(\d{4})"
);
re!(
    re_month_compact,
    r"(?i)(\d{2})(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)(\d{2})"
);

/// The raw date shapes printed on packaging that we recognize.
///
/// Declaration order is scan order, most to least specific: the numeric
/// shapes run before the month-name shapes, and a candidate from an earlier
/// shape is considered before any candidate from a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShape {
    /// `2030-06-01`, four-digit year first.
    NumericYmd,
    /// `12/25/30`, `25-12-2030`: three bare numeric groups, field roles
    /// resolved by magnitude heuristics.
    NumericGeneric,
    /// `JAN 15, 2030`, `january 15 2030`.
    MonthName,
    /// Stamped codes such as `15JAN25`, day first.
    MonthNameCompact,
}

impl DateShape {
    pub const ALL: [DateShape; 4] = [
        DateShape::NumericYmd,
        DateShape::NumericGeneric,
        DateShape::MonthName,
        DateShape::MonthNameCompact,
    ];

    /// The shapes a terse oracle reply is allowed to use (`MM/DD/YYYY` and
    /// ISO-like forms).
    pub const NUMERIC: [DateShape; 2] = [DateShape::NumericYmd, DateShape::NumericGeneric];

    pub fn regex(&self) -> &'static Regex {
        match self {
            DateShape::NumericYmd => re_numeric_ymd(),
            DateShape::NumericGeneric => re_numeric_generic(),
            DateShape::MonthName => re_month_name(),
            DateShape::MonthNameCompact => re_month_compact(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateShape::NumericYmd => "numeric_ymd",
            DateShape::NumericGeneric => "numeric_generic",
            DateShape::MonthName => "month_name",
            DateShape::MonthNameCompact => "month_name_compact",
        }
    }
}

impl fmt::Display for DateShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Month vocabulary ─────────────────────────────────────────────────────────

/// Map a month token to its number by its first three letters.
pub fn month_number(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    let month = match token.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
