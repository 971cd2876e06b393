//! Pluggable tabular file parsing.
//!
//! Each format implements [`TabularFileParser`]; the [`ParserRegistry`]
//! resolves a parser from a filename's extension. Adding a format means
//! adding a registry entry and an implementation; the ingestion engine does
//! not change.

pub mod delimited;
pub mod infer;
pub mod schema;
pub mod workbook;

use std::sync::Arc;

use thiserror::Error;

use crate::models::{ColumnDefinition, ParserOptions};
use delimited::DelimitedTextParser;
use workbook::WorkbookParser;

pub use schema::SchemaDetector;

/// One row yielded by a streaming parse: either a column-keyed mapping of
/// JSON scalars, or a failure marker. Row numbers are 1-based over yielded
/// rows; a malformed row never aborts the stream.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub row_number: i64,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    pub error: Option<String>,
}

impl ParsedRow {
    pub fn ok(row_number: i64, data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            row_number,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(row_number: i64, error: impl Into<String>) -> Self {
        Self {
            row_number,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of running a parser in sampling mode.
#[derive(Debug, Clone)]
pub struct DetectedSchema {
    pub columns: Vec<ColumnDefinition>,
    /// Exact for in-memory sources: sampling exhausts the stream.
    pub estimated_rows: i64,
}

/// Parsing errors
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Unsupported file format '{extension}'. Supported extensions: {supported}")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("Input is empty")]
    EmptyInput,

    #[error("File contains no rows")]
    NoRows,

    #[error("Worksheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Malformed input: {0}")]
    Malformed(String),
}

/// A format-specific parser over an in-memory byte source.
///
/// Sources are byte slices, so every call re-reads from the beginning;
/// `detect_schema` leaves nothing to rewind before `parse_stream`.
pub trait TabularFileParser: Send + Sync + std::fmt::Debug {
    /// Extensions this parser accepts, lowercase, without the leading dot.
    fn supported_extensions(&self) -> &'static [&'static str];

    /// Whether this parser accepts the given filename.
    fn can_handle(&self, file_name: &str) -> bool {
        file_extension(file_name)
            .map(|ext| self.supported_extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Sampling mode: detect column metadata and count rows.
    fn detect_schema(
        &self,
        data: &[u8],
        options: &ParserOptions,
    ) -> Result<DetectedSchema, ParserError>;

    /// First `rows` parsed rows, for client-side option confirmation.
    fn preview(
        &self,
        data: &[u8],
        options: &ParserOptions,
        rows: usize,
    ) -> Result<Vec<ParsedRow>, ParserError> {
        Ok(self.parse_stream(data, options)?.take(rows).collect())
    }

    /// Lazy sequence of parsed rows. Honors `skip_rows` (applied before the
    /// header when one exists) and assigns 1-based row numbers over yielded
    /// rows.
    fn parse_stream<'a>(
        &self,
        data: &'a [u8],
        options: &ParserOptions,
    ) -> Result<Box<dyn Iterator<Item = ParsedRow> + Send + 'a>, ParserError>;
}

/// Lowercased extension of a filename, without the dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Fabricated name for a column with a blank or absent header cell.
pub(crate) fn fallback_column_name(index: usize) -> String {
    format!("Column{}", index + 1)
}

/// Resolves parsers by filename extension.
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn TabularFileParser>>,
}

impl ParserRegistry {
    /// Registry with the built-in delimited text and workbook parsers.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Arc::new(DelimitedTextParser::new()),
                Arc::new(WorkbookParser::new()),
            ],
        }
    }

    /// Resolve a parser for a filename, case-insensitive on the extension.
    pub fn resolve(&self, file_name: &str) -> Result<Arc<dyn TabularFileParser>, ParserError> {
        self.parsers
            .iter()
            .find(|parser| parser.can_handle(file_name))
            .cloned()
            .ok_or_else(|| ParserError::UnsupportedFormat {
                extension: file_extension(file_name).unwrap_or_else(|| "(none)".to_string()),
                supported: self.supported_extensions_display(),
            })
    }

    /// Union of supported extensions, without dots.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.parsers
            .iter()
            .flat_map(|parser| parser.supported_extensions().iter().copied())
            .collect()
    }

    /// Human-readable list, e.g. ".csv, .tsv, .txt, .xlsx, .xls".
    pub fn supported_extensions_display(&self) -> String {
        self.supported_extensions()
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
