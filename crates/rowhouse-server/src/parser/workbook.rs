//! Spreadsheet workbook parser (`.xlsx`, `.xls`).
//!
//! Operates over the selected sheet's used range. Native cell types are
//! preserved on the way out: booleans, numbers (as floating point),
//! timestamps, ISO durations as text, everything else as trimmed strings;
//! empty cells become null. Schema detection classifies by native cell type,
//! sending text cells through the string classifier.

use std::io::Cursor;

use calamine::{Data, DataType as _, Range, Reader};
use chrono::{TimeZone, Utc};
use rowhouse_common::{CellValue, ColumnType};

use super::{
    fallback_column_name, infer, DetectedSchema, ParsedRow, ParserError, TabularFileParser,
};
use crate::models::{ColumnDefinition, ParserOptions};

const EXTENSIONS: &[&str] = &["xlsx", "xls"];

#[derive(Debug)]
pub struct WorkbookParser;

impl WorkbookParser {
    pub fn new() -> Self {
        Self
    }

    /// Load the selected sheet's used range; absent or empty `sheet_name`
    /// selects the first sheet.
    fn load_range(data: &[u8], options: &ParserOptions) -> Result<Range<Data>, ParserError> {
        if data.is_empty() {
            return Err(ParserError::EmptyInput);
        }

        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data))?;
        let names: Vec<String> = workbook.sheet_names().to_vec();

        let sheet = match options.sheet_name.as_deref().filter(|name| !name.is_empty()) {
            Some(requested) => {
                if !names.iter().any(|name| name == requested) {
                    return Err(ParserError::MissingSheet(requested.to_string()));
                }
                requested.to_string()
            }
            None => names.first().cloned().ok_or(ParserError::NoRows)?,
        };

        Ok(workbook.worksheet_range(&sheet)?)
    }

    fn header_names(row: &[Data]) -> Vec<String> {
        row.iter()
            .enumerate()
            .map(|(idx, cell)| {
                let label = cell_display(cell);
                if label.is_empty() {
                    fallback_column_name(idx)
                } else {
                    label
                }
            })
            .collect()
    }
}

impl Default for WorkbookParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularFileParser for WorkbookParser {
    fn supported_extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn detect_schema(
        &self,
        data: &[u8],
        options: &ParserOptions,
    ) -> Result<DetectedSchema, ParserError> {
        let range = Self::load_range(data, options)?;
        let width = range.width();
        let mut rows = range.rows().skip(options.skip_rows);

        let names = if options.has_header {
            match rows.next() {
                Some(row) => Self::header_names(row),
                None => return Err(ParserError::NoRows),
            }
        } else {
            (0..width).map(fallback_column_name).collect()
        };

        if names.is_empty() {
            return Err(ParserError::NoRows);
        }

        let mut cell_types: Vec<Vec<ColumnType>> = vec![Vec::new(); names.len()];
        let mut row_count: i64 = 0;

        for row in rows {
            if row_count < infer::MAX_TYPE_SAMPLES as i64 {
                for (idx, samples) in cell_types.iter_mut().enumerate() {
                    if let Some(ty) = row.get(idx).and_then(classify_cell) {
                        samples.push(ty);
                    }
                }
            }
            row_count += 1;
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let detected = infer::aggregate(cell_types[idx].iter().copied());
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
        let range = Self::load_range(data, options)?;
        let width = range.width();
        let mut rows = range.rows();
        for _ in 0..options.skip_rows {
            if rows.next().is_none() {
                break;
            }
        }

        let names = if options.has_header {
            match rows.next() {
                Some(row) => Self::header_names(row),
                None => return Err(ParserError::NoRows),
            }
        } else {
            (0..width).map(fallback_column_name).collect()
        };

        // The used range is already fully decoded in memory; materialize the
        // remaining rows so the iterator can outlive the range.
        let remaining: Vec<Vec<Data>> = rows.map(|row| row.to_vec()).collect();

        Ok(Box::new(remaining.into_iter().enumerate().map(
            move |(idx, row)| {
                let mut data = serde_json::Map::with_capacity(names.len());
                for (col, name) in names.iter().enumerate() {
                    let value = row.get(col).map(cell_to_value).unwrap_or(CellValue::Null);
                    data.insert(name.clone(), value.into_json());
                }
                ParsedRow::ok(idx as i64 + 1, data)
            },
        )))
    }
}

/// Native-type classification for schema detection. Empty cells and blank
/// strings carry no evidence.
fn classify_cell(cell: &Data) -> Option<ColumnType> {
    match cell {
        Data::Empty => None,
        Data::Bool(_) => Some(ColumnType::Boolean),
        // Workbook numbers are floating-point on the way out, whatever the
        // cell encoding; xls RK integers land here too.
        Data::Int(_) | Data::Float(_) => Some(ColumnType::Decimal),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(ColumnType::DateTime),
        Data::DurationIso(_) => Some(ColumnType::String),
        Data::Error(_) => Some(ColumnType::Unknown),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(infer::classify(trimmed))
            }
        }
    }
}

/// Convert a cell to its emitted scalar, preserving native types.
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Float(*i as f64),
        Data::Float(f) => CellValue::Float(*f),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|naive| CellValue::Timestamp(Utc.from_utc_datetime(&naive)))
            .unwrap_or(CellValue::Null),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
    }
}

/// Render a header cell as a column label.
fn cell_display(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        other => other.to_string().trim().to_string(),
    }
}
