//! Schema detection over the parser registry.

use std::sync::Arc;

use super::{DetectedSchema, ParserError, ParserRegistry};
use crate::models::ParserOptions;

/// Resolves the right parser for a file and runs it in sampling mode.
///
/// Sources are in-memory byte slices; the streaming parse that follows
/// re-reads from offset zero, so there is no cursor to rewind.
pub struct SchemaDetector {
    registry: Arc<ParserRegistry>,
}

impl SchemaDetector {
    pub fn new(registry: Arc<ParserRegistry>) -> Self {
        Self { registry }
    }

    pub fn detect(
        &self,
        file_name: &str,
        data: &[u8],
        options: &ParserOptions,
    ) -> Result<DetectedSchema, ParserError> {
        let parser = self.registry.resolve(file_name)?;
        parser.detect_schema(data, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowhouse_common::ColumnType;

    #[test]
    fn test_detect_dispatches_by_extension() {
        let detector = SchemaDetector::new(Arc::new(ParserRegistry::new()));
        let schema = detector
            .detect(
                "numbers.csv",
                b"a,b\n1,2\n",
                &ParserOptions {
                    delimiter: ',',
                    has_header: true,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].detected_type, ColumnType::Integer);
        assert_eq!(schema.estimated_rows, 1);
    }

    #[test]
    fn test_detect_unsupported_extension() {
        let detector = SchemaDetector::new(Arc::new(ParserRegistry::new()));
        assert!(matches!(
            detector.detect("notes.md", b"# hi", &ParserOptions::default()),
            Err(ParserError::UnsupportedFormat { .. })
        ));
    }
}
