//! Read-side queries for the imports feature.

pub mod get_import;
pub mod get_progress;
pub mod list_imports;
pub mod list_records;
pub mod preview;
pub mod search_records;

pub use get_import::{GetImportError, GetImportQuery, ImportJobDetails};
pub use get_progress::{GetProgressError, GetProgressQuery};
pub use list_imports::ListImportsQuery;
pub use list_records::{ListRecordsError, ListRecordsQuery, RecordView};
pub use preview::{PreviewQuery, PreviewResponse};
pub use search_records::{SearchRecordsError, SearchRecordsQuery};
