use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::Timestamp;
use crate::parsing::ParsedRow;

pub const PAN_PATTERN: &str = r"^[A-Z]{5}[0-9]{4}[A-Z]$";

// ---------------------------------------------------------------------------
// Row errors and column checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_number: usize,
    pub errors: Vec<String>,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row_number, self.errors.join("; "))
    }
}

/// File row number for a zero-based data row index: one for the header line,
/// one for 1-based counting.
pub fn row_number(index: usize) -> usize {
    index + 2
}

/// Required columns absent from `headers`, in `required` order.
pub fn missing_columns(headers: &[String], required: &[&str]) -> Vec<String> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    required
        .iter()
        .filter(|col| !normalized.contains(&col.trim().to_lowercase()))
        .map(|col| col.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Scalar parsing with browser-compatible semantics
// ---------------------------------------------------------------------------

fn float_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float prefix pattern")
    })
}

fn int_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+").expect("int prefix pattern"))
}

fn pan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PAN_PATTERN).expect("PAN pattern"))
}

/// Longest leading decimal literal, like `parseFloat`. `"12.5kg"` is 12.5,
/// `"abc"` is None. Non-finite results are rejected.
pub fn parse_float(raw: &str) -> Option<f64> {
    let m = float_prefix().find(raw.trim_start())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Leading base-10 integer, like `parseInt(raw, 10)`. `"12.9"` is 12.
pub fn parse_int(raw: &str) -> Option<i64> {
    let m = int_prefix().find(raw.trim_start())?;
    m.as_str().parse::<i64>().ok()
}

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Milliseconds since the epoch. Values without an offset are read as UTC.
pub fn parse_date_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp_millis());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Backend timestamp for a date string: `epoch_millis * 1_000_000`.
pub fn parse_date_nanos(raw: &str) -> Option<Timestamp> {
    parse_date_millis(raw)?.checked_mul(1_000_000)
}

/// Checks the raw value as given; callers uppercase first.
pub fn validate_pan(pan: &str) -> bool {
    pan_regex().is_match(pan)
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

/// Accumulates every defect in one row. Checks never short-circuit across
/// fields; a format check only runs when the field is present.
pub struct RowChecks<'a> {
    row: &'a ParsedRow,
    errors: Vec<String>,
}

impl<'a> RowChecks<'a> {
    pub fn new(row: &'a ParsedRow) -> Self {
        Self {
            row,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Trimmed value, or records `"{field} is required"`.
    pub fn required(&mut self, field: &str) -> Option<&'a str> {
        let value = self.row.value(field).trim();
        if value.is_empty() {
            self.errors.push(format!("{field} is required"));
            None
        } else {
            Some(value)
        }
    }

    pub fn number(&mut self, field: &str) -> Option<f64> {
        let raw = self.required(field)?;
        let parsed = parse_float(raw);
        if parsed.is_none() {
            self.errors.push(format!("{field} must be a valid number (got: {raw})"));
        }
        parsed
    }

    pub fn positive_number(&mut self, field: &str) -> Option<f64> {
        let raw = self.required(field)?;
        match parse_float(raw) {
            Some(v) if v > 0.0 => Some(v),
            _ => {
                self.errors.push(format!("{field} must be a positive number (got: {raw})"));
                None
            }
        }
    }

    /// Positivity is judged on the integer that will actually be stored.
    pub fn positive_integer(&mut self, field: &str) -> Option<u64> {
        let raw = self.required(field)?;
        match parse_int(raw) {
            Some(v) if v > 0 => Some(v as u64),
            _ => {
                self.errors.push(format!("{field} must be a positive number (got: {raw})"));
                None
            }
        }
    }

    pub fn identifier(&mut self, field: &str) -> Option<u64> {
        let raw = self.required(field)?;
        match parse_int(raw) {
            Some(v) if v >= 0 => Some(v as u64),
            _ => {
                self.errors.push(format!("{field} must be a valid number (got: {raw})"));
                None
            }
        }
    }

    pub fn date(&mut self, field: &str) -> Option<Timestamp> {
        let raw = self.required(field)?;
        let parsed = parse_date_nanos(raw);
        if parsed.is_none() {
            self.errors.push(format!("{field} must be a valid date (got: {raw})"));
        }
        parsed
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}
