//! Per-cell classification.
//!
//! Every sampled cell is classified once into a [`CellValue`]; the column accumulator only
//! looks at the tag.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex_lite::Regex;

use super::lattice::TypeEvidence;
use crate::types::ColumnType;

/// Tokens that mean "no value". Compared trimmed and lowercased.
pub const NULL_LIKE: [&str; 8] = ["", "null", "none", "na", "n/a", "nan", "nil", "-"];

const TRUE_TOKENS: [&str; 4] = ["true", "t", "yes", "y"];
const FALSE_TOKENS: [&str; 4] = ["false", "f", "no", "n"];

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.\d*|\d*\.\d+|\d+)([eE][+-]?\d+)?$").unwrap()
});

static BARE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").unwrap());

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// A classified cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// A null-like token.
    Null,
    /// `0` or `1`.
    Binary(bool),
    /// A boolean word such as `yes` or `F`.
    Bool(bool),
    /// An integer that fits in 64 bits.
    Int(i64),
    /// A decimal or exponential number.
    Float(f64),
    /// A bare `YYYY-MM-DD` (or `/`-separated) date.
    Date(NaiveDate),
    /// Any other recognized date or date-time.
    Timestamp(NaiveDateTime),
    /// Anything else.
    Text(String),
}

impl CellValue {
    /// Classify one raw cell. The value is trimmed once; patterns are tried in order:
    /// null-like, boolean, integer, decimal, date/time, text.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let value = raw.trim();
        let lower = value.to_ascii_lowercase();

        if NULL_LIKE.contains(&lower.as_str()) {
            return Self::Null;
        }
        match lower.as_str() {
            "1" => return Self::Binary(true),
            "0" => return Self::Binary(false),
            _ => {},
        }
        if TRUE_TOKENS.contains(&lower.as_str()) {
            return Self::Bool(true);
        }
        if FALSE_TOKENS.contains(&lower.as_str()) {
            return Self::Bool(false);
        }
        if INT_RE.is_match(value) {
            // Out-of-range integers cannot be loaded as INT64.
            return value
                .parse::<i64>()
                .map_or_else(|_| Self::Text(value.to_string()), Self::Int);
        }
        if FLOAT_RE.is_match(value) {
            if let Ok(f) = value.parse::<f64>() {
                return Self::Float(f);
            }
        }
        if let Some(dt) = parse_datetime(value) {
            if BARE_DATE_RE.is_match(value) && dt.time() == NaiveTime::MIN {
                return Self::Date(dt.date());
            }
            return Self::Timestamp(dt);
        }
        Self::Text(value.to_string())
    }

    /// Evidence this cell contributes to its column, or `None` for null-like cells.
    #[must_use]
    pub fn evidence(&self) -> Option<TypeEvidence> {
        let t = match self {
            Self::Null => return None,
            Self::Binary(_) => return Some(TypeEvidence::Binary),
            Self::Bool(_) => ColumnType::Bool,
            Self::Int(_) => ColumnType::Int64,
            Self::Float(_) => ColumnType::Float64,
            Self::Date(_) => ColumnType::Date,
            Self::Timestamp(_) => ColumnType::Timestamp,
            Self::Text(_) => ColumnType::String,
        };
        Some(TypeEvidence::Typed(t))
    }
}

/// Best-effort date/time parsing. Values with an offset keep their wall-clock time.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_of(raw: &str) -> Option<ColumnType> {
        CellValue::classify(raw).evidence().map(TypeEvidence::resolve)
    }

    #[test]
    fn test_null_like_tokens() {
        for raw in ["", "  ", "NULL", "None", "na", "N/A", "NaN", "nil", " - "] {
            assert_eq!(CellValue::classify(raw), CellValue::Null, "{raw:?}");
        }
    }

    #[test]
    fn test_booleans_and_binary() {
        assert_eq!(CellValue::classify("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::classify(" no "), CellValue::Bool(false));
        assert_eq!(CellValue::classify("Y"), CellValue::Bool(true));
        assert_eq!(CellValue::classify("1"), CellValue::Binary(true));
        assert_eq!(CellValue::classify("0"), CellValue::Binary(false));
        assert_eq!(type_of("0"), Some(ColumnType::Bool));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(CellValue::classify("42"), CellValue::Int(42));
        assert_eq!(CellValue::classify("-7"), CellValue::Int(-7));
        assert_eq!(CellValue::classify("+3"), CellValue::Int(3));
        assert_eq!(CellValue::classify("10.5"), CellValue::Float(10.5));
        assert_eq!(CellValue::classify(".5"), CellValue::Float(0.5));
        assert_eq!(CellValue::classify("2."), CellValue::Float(2.0));
        assert_eq!(CellValue::classify("1e3"), CellValue::Float(1000.0));
        assert_eq!(type_of("99999999999999999999"), Some(ColumnType::String));
    }

    #[test]
    fn test_dates_and_timestamps() {
        assert_eq!(type_of("2024-01-01"), Some(ColumnType::Date));
        assert_eq!(type_of("2024/1/5"), Some(ColumnType::Date));
        assert_eq!(type_of("2024-01-02T10:00:00"), Some(ColumnType::Timestamp));
        assert_eq!(type_of("2024-01-02 10:00:00.123"), Some(ColumnType::Timestamp));
        assert_eq!(type_of("2024-01-02T10:00:00Z"), Some(ColumnType::Timestamp));
        assert_eq!(
            type_of("2024-01-02 10:00:00+02:00"),
            Some(ColumnType::Timestamp)
        );
        // Parses as a date, but not in the bare year-first shape.
        assert_eq!(type_of("01/02/2024"), Some(ColumnType::Timestamp));
        assert_eq!(type_of("March 5, 2024"), Some(ColumnType::Timestamp));
    }

    #[test]
    fn test_time_only_values_are_text() {
        // A time of day has no date to anchor a TIMESTAMP to.
        for raw in ["10:00", "10:00:00", "23:59:59.5", "9:30 PM"] {
            assert_eq!(
                CellValue::classify(raw),
                CellValue::Text(raw.to_string()),
                "{raw:?}"
            );
            assert_eq!(type_of(raw), Some(ColumnType::String), "{raw:?}");
        }
    }

    #[test]
    fn test_text() {
        assert_eq!(
            CellValue::classify(" maybe "),
            CellValue::Text("maybe".to_string())
        );
        assert_eq!(type_of("2024-13-45"), Some(ColumnType::String));
        assert_eq!(type_of("10:00"), Some(ColumnType::String));
        assert_eq!(type_of("inf"), Some(ColumnType::String));
    }
}
