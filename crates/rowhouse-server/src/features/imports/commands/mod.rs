//! Write-side commands for the imports feature.

pub mod delete;
pub mod submit;

pub use delete::{DeleteImportCommand, DeleteImportError, DeleteImportResponse};
pub use submit::{SubmitImportCommand, SubmitImportError, SubmitMode};
