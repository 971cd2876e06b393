//! Delimited text parser (`.csv`, `.tsv`, `.txt`).
//!
//! Schema mode samples the first 100 data rows for type inference and
//! exhausts the stream for an exact row count; streaming mode coerces each
//! cell to its column's detected type, keeping the trimmed string when a
//! value refuses to coerce. A row the reader cannot decode yields a failure
//! marker and the stream continues.

use chrono::{NaiveTime, TimeZone, Utc};
use rowhouse_common::{CellValue, ColumnType};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{
    fallback_column_name, infer, DetectedSchema, ParsedRow, ParserError, TabularFileParser,
};
use crate::models::{ColumnDefinition, ParserOptions};

const EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

#[derive(Debug)]
pub struct DelimitedTextParser;

impl DelimitedTextParser {
    pub fn new() -> Self {
        Self
    }

    fn reader<'a>(data: &'a [u8], delimiter: u8) -> csv::Reader<&'a [u8]> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(data)
    }

    fn delimiter_byte(options: &ParserOptions) -> Result<u8, ParserError> {
        if options.delimiter.is_ascii() {
            Ok(options.delimiter as u8)
        } else {
            Err(ParserError::Malformed(format!(
                "delimiter '{}' is not a single ASCII character",
                options.delimiter
            )))
        }
    }

    /// Column names from a header record; blank cells get fabricated names.
    fn header_names(record: &csv::StringRecord) -> Vec<String> {
        record
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let trimmed = cell.trim();
                if trimmed.is_empty() {
                    fallback_column_name(idx)
                } else {
                    trimmed.to_string()
                }
            })
            .collect()
    }
}

impl Default for DelimitedTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularFileParser for DelimitedTextParser {
    fn supported_extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn detect_schema(
        &self,
        data: &[u8],
        options: &ParserOptions,
    ) -> Result<DetectedSchema, ParserError> {
        if data.is_empty() {
            return Err(ParserError::EmptyInput);
        }
        let delimiter = Self::delimiter_byte(options)?;
        let mut records = Self::reader(data, delimiter).into_records();

        for _ in 0..options.skip_rows {
            if records.next().is_none() {
                break;
            }
        }

        let mut names: Option<Vec<String>> = None;
        if options.has_header {
            match records.next() {
                Some(Ok(record)) => names = Some(Self::header_names(&record)),
                Some(Err(e)) => {
                    return Err(ParserError::Malformed(format!(
                        "failed to read header row: {e}"
                    )))
                }
                None => return Err(ParserError::NoRows),
            }
        }

        let mut samples: Vec<Vec<String>> = names
            .as_ref()
            .map(|names| vec![Vec::new(); names.len()])
            .unwrap_or_default();
        let mut row_count: i64 = 0;

        for result in records {
            let record = match result {
                Ok(record) => record,
                Err(_) => {
                    // Undecodable rows still count toward the estimate; the
                    // streaming pass will yield them as failures.
                    row_count += 1;
                    continue;
                }
            };

            // Without a header the first data row fixes the column count.
            if names.is_none() {
                let fabricated: Vec<String> = (0..record.len()).map(fallback_column_name).collect();
                samples = vec![Vec::new(); fabricated.len()];
                names = Some(fabricated);
            }

            if row_count < infer::MAX_TYPE_SAMPLES as i64 {
                for (idx, column_samples) in samples.iter_mut().enumerate() {
                    if let Some(cell) = record.get(idx) {
                        let trimmed = cell.trim();
                        if !trimmed.is_empty() {
                            column_samples.push(trimmed.to_string());
                        }
                    }
                }
            }
            row_count += 1;
        }

        let names = names.ok_or(ParserError::NoRows)?;
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let detected = samples
                    .get(idx)
                    .map(|s| infer::infer_column_type(s.iter().map(String::as_str)))
                    .unwrap_or(ColumnType::String);
                ColumnDefinition::new(name, idx, detected)
            })
            .collect();

        Ok(DetectedSchema {
            columns,
            estimated_rows: row_count,
        })
    }

    fn parse_stream<'a>(
        &self,
        data: &'a [u8],
        options: &ParserOptions,
    ) -> Result<Box<dyn Iterator<Item = ParsedRow> + Send + 'a>, ParserError> {
        let schema = self.detect_schema(data, options)?;
        let columns: Vec<(String, ColumnType)> = schema
            .columns
            .into_iter()
            .map(|column| (column.name, column.detected_type))
            .collect();

        let delimiter = Self::delimiter_byte(options)?;
        let mut records = Self::reader(data, delimiter).into_records();
        for _ in 0..options.skip_rows {
            if records.next().is_none() {
                break;
            }
        }
        if options.has_header {
            records.next();
        }

        Ok(Box::new(DelimitedRows {
            records,
            columns,
            next_row: 1,
        }))
    }
}

struct DelimitedRows<'a> {
    records: csv::StringRecordsIntoIter<&'a [u8]>,
    columns: Vec<(String, ColumnType)>,
    next_row: i64,
}

impl Iterator for DelimitedRows<'_> {
    type Item = ParsedRow;

    fn next(&mut self) -> Option<ParsedRow> {
        let result = self.records.next()?;
        let row_number = self.next_row;
        self.next_row += 1;

        match result {
            Ok(record) => {
                let mut data = serde_json::Map::with_capacity(self.columns.len());
                for (idx, (name, detected)) in self.columns.iter().enumerate() {
                    let raw = record.get(idx).unwrap_or("");
                    data.insert(name.clone(), coerce_value(raw, *detected).into_json());
                }
                Some(ParsedRow::ok(row_number, data))
            }
            Err(e) => Some(ParsedRow::failed(row_number, e.to_string())),
        }
    }
}

/// Coerce a raw cell to its column's detected type. Empty cells are null;
/// a value that refuses to coerce stays a trimmed string.
fn coerce_value(raw: &str, detected: ColumnType) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }

    match detected {
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(trimmed.to_string())),
        ColumnType::Decimal => Decimal::from_str(trimmed)
            .map(CellValue::Decimal)
            .unwrap_or_else(|_| CellValue::Text(trimmed.to_string())),
        ColumnType::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                CellValue::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                CellValue::Bool(false)
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        ColumnType::DateTime => infer::parse_timestamp(trimmed)
            .map(CellValue::Timestamp)
            .unwrap_or_else(|| CellValue::Text(trimmed.to_string())),
        ColumnType::Date => infer::parse_date(trimmed)
            .map(|date| CellValue::Timestamp(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))))
            .unwrap_or_else(|| CellValue::Text(trimmed.to_string())),
        ColumnType::String | ColumnType::Unknown => CellValue::Text(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(delimiter: char, has_header: bool) -> ParserOptions {
        ParserOptions {
            delimiter,
            has_header,
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_schema_with_header() {
        let parser = DelimitedTextParser::new();
        let data = b"a,b,c\n1,2,3\n4,5,6\n";
        let schema = parser.detect_schema(data, &options(',', true)).unwrap();

        assert_eq!(schema.estimated_rows, 2);
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        for column in &schema.columns {
            assert_eq!(column.detected_type, ColumnType::Integer);
        }
        let indexes: Vec<usize> = schema.columns.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_detect_schema_without_header_fabricates_names() {
        let parser = DelimitedTextParser::new();
        let data = b"1;x\n2;y\n";
        let schema = parser.detect_schema(data, &options(';', false)).unwrap();

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Column1", "Column2"]);
        assert_eq!(schema.columns[0].detected_type, ColumnType::Integer);
        assert_eq!(schema.columns[1].detected_type, ColumnType::String);
        assert_eq!(schema.estimated_rows, 2);
    }

    #[test]
    fn test_detect_schema_blank_header_cell() {
        let parser = DelimitedTextParser::new();
        let data = b"a,,c\n1,2,3\n";
        let schema = parser.detect_schema(data, &options(',', true)).unwrap();

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "Column2", "c"]);
    }

    #[test]
    fn test_detect_schema_mixed_column_falls_back_to_string() {
        let parser = DelimitedTextParser::new();
        let data = b"x\n1\ntwo\n3\n";
        let schema = parser.detect_schema(data, &options(',', true)).unwrap();

        assert_eq!(schema.columns[0].detected_type, ColumnType::String);
        assert_eq!(schema.estimated_rows, 3);
    }

    #[test]
    fn test_detect_schema_skip_rows_before_header() {
        let parser = DelimitedTextParser::new();
        let data = b"junk line\nanother\na,b\n1,2\n";
        let opts = ParserOptions {
            delimiter: ',',
            has_header: true,
            skip_rows: 2,
            ..Default::default()
        };
        let schema = parser.detect_schema(data, &opts).unwrap();

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(schema.estimated_rows, 1);
    }

    #[test]
    fn test_detect_schema_empty_input() {
        let parser = DelimitedTextParser::new();
        assert!(matches!(
            parser.detect_schema(b"", &options(',', true)),
            Err(ParserError::EmptyInput)
        ));
    }

    #[test]
    fn test_detect_schema_header_only() {
        let parser = DelimitedTextParser::new();
        let schema = parser
            .detect_schema(b"a,b\n", &options(',', true))
            .unwrap();
        assert_eq!(schema.estimated_rows, 0);
        // Zero samples resolve to string.
        assert_eq!(schema.columns[0].detected_type, ColumnType::String);
    }

    #[test]
    fn test_parse_stream_coerces_to_detected_types() {
        let parser = DelimitedTextParser::new();
        let data = b"a,b,c\n1,2,3\n4,5,6\n";
        let rows: Vec<ParsedRow> = parser
            .parse_stream(data, &options(',', true))
            .unwrap()
            .collect();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(ParsedRow::is_ok));
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[1].row_number, 2);

        let first = rows[0].data.as_ref().unwrap();
        assert_eq!(first.get("a"), Some(&json!(1)));
        assert_eq!(first.get("b"), Some(&json!(2)));
        assert_eq!(first.get("c"), Some(&json!(3)));
    }

    #[test]
    fn test_parse_stream_string_column_keeps_raw_values() {
        let parser = DelimitedTextParser::new();
        let data = b"x\n1\ntwo\n3\n";
        let rows: Vec<ParsedRow> = parser
            .parse_stream(data, &options(',', true))
            .unwrap()
            .collect();

        let values: Vec<&serde_json::Value> = rows
            .iter()
            .map(|row| row.data.as_ref().unwrap().get("x").unwrap())
            .collect();
        assert_eq!(values, vec![&json!("1"), &json!("two"), &json!("3")]);
    }

    #[test]
    fn test_parse_stream_empty_cell_is_null() {
        let parser = DelimitedTextParser::new();
        let data = b"a,b\n1,\n";
        let rows: Vec<ParsedRow> = parser
            .parse_stream(data, &options(',', true))
            .unwrap()
            .collect();

        let first = rows[0].data.as_ref().unwrap();
        assert_eq!(first.get("b"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_parse_stream_short_row_fills_nulls() {
        let parser = DelimitedTextParser::new();
        let data = b"a,b,c\n1,2,3\n4,5\n";
        let rows: Vec<ParsedRow> = parser
            .parse_stream(data, &options(',', true))
            .unwrap()
            .collect();

        assert!(rows[1].is_ok());
        let second = rows[1].data.as_ref().unwrap();
        assert_eq!(second.get("c"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_parse_stream_undecodable_row_is_counted_not_fatal() {
        let parser = DelimitedTextParser::new();
        let mut data = b"a,b\n1,2\n".to_vec();
        data.extend_from_slice(&[0xFF, 0xFE]);
        data.extend_from_slice(b",3\n4,5\n");

        let rows: Vec<ParsedRow> = parser
            .parse_stream(&data, &options(',', true))
            .unwrap()
            .collect();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(!rows[1].is_ok());
        assert!(rows[1].error.is_some());
        assert!(rows[2].is_ok());
        // Row numbers stay 1-based over yielded rows.
        assert_eq!(rows[2].row_number, 3);
    }

    #[test]
    fn test_preview_limits_rows() {
        let parser = DelimitedTextParser::new();
        let data = b"a\n1\n2\n3\n4\n5\n";
        let rows = parser.preview(data, &options(',', true), 2).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_datetime_column_round_trip() {
        let parser = DelimitedTextParser::new();
        let data = b"ts\n2024-03-01T08:30:00Z\n2024-03-02T09:00:00Z\n";
        let schema = parser.detect_schema(data, &options(',', true)).unwrap();
        assert_eq!(schema.columns[0].detected_type, ColumnType::DateTime);

        let rows: Vec<ParsedRow> = parser
            .parse_stream(data, &options(',', true))
            .unwrap()
            .collect();
        let value = rows[0].data.as_ref().unwrap().get("ts").unwrap();
        assert_eq!(value, &json!("2024-03-01T08:30:00Z"));
    }
}
