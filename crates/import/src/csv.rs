use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;
use tally_core::Money;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
}

/// A statement export read fully into memory.
#[derive(Debug, Clone)]
pub struct StatementFile {
    /// `None` when the manifest says the file has no header row.
    pub headers: Option<Vec<String>>,
    pub records: Vec<StringRecord>,
}

pub fn read_statement(
    path: &Path,
    has_headers: bool,
    add_header_comma: bool,
) -> Result<StatementFile, CsvError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_statement(&text, has_headers, add_header_comma)
}

pub fn parse_statement(
    raw: &str,
    has_headers: bool,
    add_header_comma: bool,
) -> Result<StatementFile, CsvError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let text: Cow<'_, str> = if add_header_comma {
        Cow::Owned(append_header_delimiter(raw))
    } else {
        Cow::Borrowed(raw)
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = if has_headers {
        Some(reader.headers()?.iter().map(str::to_string).collect())
    } else {
        None
    };
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    Ok(StatementFile { headers, records })
}

/// Some exports omit the trailing delimiter on the header line while every
/// data row carries one, which shifts the columns by one.
fn append_header_delimiter(raw: &str) -> String {
    let (first, rest) = match raw.find('\n') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    format!("{},{}", first.trim_end(), rest)
}

/// Parses a single amount cell.
///
/// Accepts `$`, thousands separators and accounting parentheses. A leading
/// `--` is a doubled sign some banks emit for credits and reads as positive.
pub fn parse_amount(raw: &str) -> Result<Money, CsvError> {
    let s = raw.trim();
    let s = s.strip_prefix("--").unwrap_or(s);
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let mut dec =
        Decimal::from_str(&cleaned).map_err(|_| CsvError::InvalidAmount(raw.trim().to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

/// Debit/credit cells: blank and zero both mean "not this side".
pub fn parse_optional_amount(raw: &str) -> Result<Option<Money>, CsvError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let amount = parse_amount(raw)?;
    Ok((!amount.is_zero()).then_some(amount))
}

// Two-digit years come first: `%Y` would read "24" as the year 24.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%Y",
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%b %d, %Y", "%B %d, %Y", "%b %d %Y",
    "%B %d %Y", "%d %b %Y", "%d %B %Y", "%d-%b-%y", "%d-%b-%Y", "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Permissive date parsing. Numeric dates are read month-first, falling back
/// to day-first only when month-first is impossible.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CsvError> {
    let s = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}
