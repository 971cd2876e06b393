//! Preview query
//!
//! Parses the first rows of an uploaded file without creating a job, so a
//! client can confirm delimiter and header options before importing.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{ColumnDefinition, ParserOptions};
use crate::parser::{ParserError, ParserRegistry, SchemaDetector};

/// Query to preview an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewQuery {
    pub file_name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub options: ParserOptions,
}

/// Detected columns plus the first parsed rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub columns: Vec<ColumnDefinition>,
    pub estimated_rows: i64,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl Request<Result<PreviewResponse, ParserError>> for PreviewQuery {}

pub async fn handle(
    registry: Arc<ParserRegistry>,
    query: PreviewQuery,
) -> Result<PreviewResponse, ParserError> {
    let detected = SchemaDetector::new(registry.clone())
        .detect(&query.file_name, &query.content, &query.options)?;
    let parser = registry.resolve(&query.file_name)?;
    let rows = parser
        .preview(&query.content, &query.options, query.options.preview_rows)?
        .into_iter()
        .filter_map(|row| row.data)
        .collect();

    Ok(PreviewResponse {
        columns: detected.columns,
        estimated_rows: detected.estimated_rows,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowhouse_common::ColumnType;

    #[tokio::test]
    async fn test_preview_returns_columns_and_rows() {
        let registry = Arc::new(ParserRegistry::new());
        let response = handle(
            registry,
            PreviewQuery {
                file_name: "orders.csv".to_string(),
                content: b"a,b\n1,2\n3,4\n5,6\n".to_vec(),
                options: ParserOptions {
                    delimiter: ',',
                    has_header: true,
                    preview_rows: 2,
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

        assert_eq!(response.columns.len(), 2);
        assert_eq!(response.columns[0].detected_type, ColumnType::Integer);
        assert_eq!(response.estimated_rows, 3);
        assert_eq!(response.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_preview_unsupported_format() {
        let registry = Arc::new(ParserRegistry::new());
        let result = handle(
            registry,
            PreviewQuery {
                file_name: "report.pdf".to_string(),
                content: b"%PDF".to_vec(),
                options: ParserOptions::default(),
            },
        )
        .await;
        assert!(matches!(result, Err(ParserError::UnsupportedFormat { .. })));
    }
}
