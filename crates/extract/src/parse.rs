use chrono::NaiveDate;
use thiserror::Error;

use crate::patterns::{month_number, DateShape};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    /// The text does not determine field roles for the claimed shape: no
    /// match, a non-numeric group, or a month token outside the vocabulary.
    #[error("ambiguous date text: {0}")]
    Ambiguous(String),
    /// Field roles were assigned but no in-range, calendar-valid date exists
    /// for them, even after the month/day swap retry.
    #[error("invalid calendar date: {0}")]
    Invalid(String),
}

/// Parse one raw match under the shape that produced it.
///
/// Each shape has its own pure resolution rule; the numeric shapes share the
/// magnitude table in [`resolve_numeric_roles`] and every shape funnels
/// through the same range check and swap retry.
pub fn parse(raw: &str, shape: DateShape) -> Result<NaiveDate, DateParseError> {
    let caps = shape
        .regex()
        .captures(raw)
        .ok_or_else(|| DateParseError::Ambiguous(raw.to_string()))?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    match shape {
        DateShape::NumericYmd => {
            let year = num(group(1))?;
            build_date(year, num(group(2))?, num(group(3))?)
        }
        DateShape::NumericGeneric => {
            let (year, month, day) =
                resolve_numeric_roles(num(group(1))?, num(group(2))?, num(group(3))?);
            build_date(year, month, day)
        }
        DateShape::MonthName => named_month_date(group(1), num(group(2))?, num(group(3))?),
        DateShape::MonthNameCompact => named_month_date(group(2), num(group(1))?, num(group(3))?),
    }
}

/// Decide which bare numeric group is the year.
///
/// Rules, in order:
/// 1. first group > 1000  ⇒ year-month-day as written;
/// 2. third group > 1000  ⇒ month-day-year (US order);
/// 3. otherwise           ⇒ month-day plus a two-digit year in the 2000s.
fn resolve_numeric_roles(a: i32, b: i32, c: i32) -> (i32, i32, i32) {
    if a > 1000 {
        (a, b, c)
    } else if c > 1000 {
        (c, a, b)
    } else {
        (expand_year(c), a, b)
    }
}

fn named_month_date(token: &str, day: i32, year: i32) -> Result<NaiveDate, DateParseError> {
    let month = month_number(token)
        .ok_or_else(|| DateParseError::Ambiguous(format!("unknown month '{token}'")))?;
    build_date(expand_year(year), month as i32, day)
}

/// Range-check month/day, retrying once with the two roles exchanged for
/// day-first prints, then build the calendar date.
fn build_date(year: i32, month: i32, day: i32) -> Result<NaiveDate, DateParseError> {
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        return calendar_date(year, month, day);
    }
    if (1..=12).contains(&day) && (1..=31).contains(&month) {
        return calendar_date(year, day, month);
    }
    Err(DateParseError::Invalid(format!("{month}/{day}/{year}")))
}

fn calendar_date(year: i32, month: i32, day: i32) -> Result<NaiveDate, DateParseError> {
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or_else(|| DateParseError::Invalid(format!("{year:04}-{month:02}-{day:02}")))
}

/// Two-digit years live in the 2000s. Packaging never prints a shelf life
/// a century out, so this is not general century disambiguation.
fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn num(s: &str) -> Result<i32, DateParseError> {
    s.parse()
        .map_err(|_| DateParseError::Ambiguous(format!("non-numeric group '{s}'")))
}
