//! Shared building blocks for Rowhouse components.
//!
//! - [`types`]: the cell scalar and column type vocabulary used by parsers,
//!   the ingestion engine, and the persistence layer
//! - [`error`]: the common error type absorbed by component-level errors
//! - [`logging`]: centralized `tracing` initialization

pub mod error;
pub mod logging;
pub mod types;

pub use error::{CommonError, Result};
pub use types::{CellValue, ColumnType};
