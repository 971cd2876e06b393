//! Automatic column type inference.
//!
//! [`classify`] maps a single trimmed sample onto the closed
//! [`ColumnType`] set; [`aggregate`] picks a column's type from classified
//! samples using the modal-share rule.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rowhouse_common::ColumnType;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Upper bound on samples considered per column.
pub const MAX_TYPE_SAMPLES: usize = 100;

/// Timestamp formats accepted alongside RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only formats.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Classify a single sample. Tries, in order: 64-bit signed integer,
/// fixed-point decimal, boolean, timestamp, date. First match wins; empty
/// or whitespace-only samples carry no evidence and classify as `string`.
pub fn classify(sample: &str) -> ColumnType {
    let trimmed = sample.trim();
    if trimmed.is_empty() {
        return ColumnType::String;
    }
    if trimmed.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if Decimal::from_str(trimmed).is_ok() {
        return ColumnType::Decimal;
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }
    if parse_timestamp(trimmed).is_some() {
        return ColumnType::DateTime;
    }
    if parse_date(trimmed).is_some() {
        return ColumnType::Date;
    }
    ColumnType::String
}

/// Parse a permissive timestamp: RFC 3339, or a naive datetime in one of
/// [`DATETIME_FORMATS`] interpreted as UTC.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Parse a date-only sample in one of [`DATE_FORMATS`].
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    None
}

/// Tie-break rank, mirroring the classification order.
fn rank(ty: ColumnType) -> usize {
    match ty {
        ColumnType::Integer => 0,
        ColumnType::Decimal => 1,
        ColumnType::Boolean => 2,
        ColumnType::DateTime => 3,
        ColumnType::Date => 4,
        ColumnType::String => 5,
        ColumnType::Unknown => 6,
    }
}

/// Pick a column type from classified samples: the modal type wins when it
/// holds at least an 80% share, otherwise the column falls back to `string`.
/// Zero samples also yield `string`. Ties resolve in classification order.
pub fn aggregate(types: impl IntoIterator<Item = ColumnType>) -> ColumnType {
    let mut counts = [0usize; 7];
    let mut total = 0usize;
    for ty in types.into_iter().take(MAX_TYPE_SAMPLES) {
        counts[rank(ty)] += 1;
        total += 1;
    }
    if total == 0 {
        return ColumnType::String;
    }

    let (best_rank, best_count) = counts
        .iter()
        .enumerate()
        .max_by(|(rank_a, count_a), (rank_b, count_b)| {
            count_a.cmp(count_b).then(rank_b.cmp(rank_a))
        })
        .map(|(rank, count)| (rank, *count))
        .unwrap_or((5, 0));

    // Share test in integer arithmetic: count / total >= 4 / 5.
    if best_count * 5 < total * 4 {
        return ColumnType::String;
    }

    match best_rank {
        0 => ColumnType::Integer,
        1 => ColumnType::Decimal,
        2 => ColumnType::Boolean,
        3 => ColumnType::DateTime,
        4 => ColumnType::Date,
        6 => ColumnType::Unknown,
        _ => ColumnType::String,
    }
}

/// Infer a column's type from raw string samples. Empty samples are dropped
/// before classification; at most [`MAX_TYPE_SAMPLES`] are considered.
pub fn infer_column_type<'a>(samples: impl IntoIterator<Item = &'a str>) -> ColumnType {
    aggregate(
        samples
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(classify),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_order() {
        assert_eq!(classify("42"), ColumnType::Integer);
        assert_eq!(classify("-7"), ColumnType::Integer);
        assert_eq!(classify("3.14"), ColumnType::Decimal);
        assert_eq!(classify("-0.5"), ColumnType::Decimal);
        assert_eq!(classify("true"), ColumnType::Boolean);
        assert_eq!(classify("FALSE"), ColumnType::Boolean);
        assert_eq!(classify("2024-03-01T08:30:00Z"), ColumnType::DateTime);
        assert_eq!(classify("2024-03-01 08:30:00"), ColumnType::DateTime);
        assert_eq!(classify("2024-03-01"), ColumnType::Date);
        assert_eq!(classify("03/15/2024"), ColumnType::Date);
        assert_eq!(classify("hello"), ColumnType::String);
    }

    #[test]
    fn test_classify_trims_and_treats_blank_as_string() {
        assert_eq!(classify("  42  "), ColumnType::Integer);
        assert_eq!(classify(""), ColumnType::String);
        assert_eq!(classify("   "), ColumnType::String);
    }

    #[test]
    fn test_integer_overflow_falls_to_decimal() {
        assert_eq!(classify("99999999999999999999"), ColumnType::Decimal);
    }

    #[test]
    fn test_aggregate_unanimous() {
        let samples = vec!["1", "2", "3"];
        assert_eq!(infer_column_type(samples), ColumnType::Integer);
    }

    #[test]
    fn test_aggregate_below_threshold_falls_back_to_string() {
        // 2/3 integers is 66.6%, below the 80% bar.
        let samples = vec!["1", "two", "3"];
        assert_eq!(infer_column_type(samples), ColumnType::String);
    }

    #[test]
    fn test_aggregate_at_threshold() {
        // Exactly 80% integers.
        let samples = vec!["1", "2", "3", "4", "x"];
        assert_eq!(infer_column_type(samples), ColumnType::Integer);
    }

    #[test]
    fn test_aggregate_zero_samples() {
        assert_eq!(infer_column_type(Vec::<&str>::new()), ColumnType::String);
        assert_eq!(infer_column_type(vec!["", "  "]), ColumnType::String);
    }

    #[test]
    fn test_aggregate_even_split_is_string() {
        let samples = vec!["1", "1.5"];
        assert_eq!(infer_column_type(samples), ColumnType::String);
    }

    #[test]
    fn test_aggregate_caps_samples() {
        // 100 integers followed by strings; only the first 100 samples count.
        let mut samples: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        samples.extend(std::iter::repeat("x".to_string()).take(400));
        assert_eq!(
            infer_column_type(samples.iter().map(String::as_str)),
            ColumnType::Integer
        );
    }
}
