//! Core data model for import jobs, schemas, and records.

use chrono::{DateTime, Utc};
use rowhouse_common::ColumnType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle state of an import job.
///
/// ```text
/// Pending -> Processing -> Completed | CompletedWithErrors | Failed
/// ```
///
/// The three right-hand states are terminal; a terminal job is never
/// mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::CompletedWithErrors => "CompletedWithErrors",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Failed
        )
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => JobStatus::Pending,
            "Processing" => JobStatus::Processing,
            "Completed" => JobStatus::Completed,
            "CompletedWithErrors" => JobStatus::CompletedWithErrors,
            "Failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An import job, from submission to terminal state.
///
/// Created `Pending` by the submission service; mutated only by the worker
/// that owns it; counters move only while `Processing` or in the terminal
/// transition itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub file_name: String,
    /// Lowercased extension tag, e.g. "csv" or "xlsx"
    pub file_type: String,
    pub file_size: i64,
    pub total_records: i64,
    pub processed_records: i64,
    pub failed_records: i64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ImportJob {
    /// Create a fresh `Pending` job for an accepted file.
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>, file_size: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            file_type: file_type.into(),
            file_size,
            total_records: 0,
            processed_records: 0,
            failed_records: 0,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// `Pending -> Processing`; stamps `started_at`.
    pub fn start(&mut self) {
        if self.status != JobStatus::Pending {
            return;
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Terminal transition after the stream drained: `Completed` when no row
    /// failed, `CompletedWithErrors` otherwise. Records the final counters
    /// and stamps `completed_at`.
    pub fn complete(&mut self, total: i64, processed: i64, failed: i64) {
        if self.status.is_terminal() {
            return;
        }
        self.total_records = total;
        self.processed_records = processed;
        self.failed_records = failed;
        self.status = if failed > 0 {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        };
        self.completed_at = Some(Utc::now());
    }

    /// Terminal transition for an unrecoverable error; stamps `completed_at`
    /// and keeps the message on the job.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock duration, available once both timestamps exist.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}

/// One detected column of an imported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Zero-based position, dense over `[0, column_count)`
    pub index: usize,
    pub detected_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, index: usize, detected_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            index,
            detected_type,
            display_name: None,
            is_ignored: false,
        }
    }
}

/// The detected schema of a job's file; exactly one per job, written before
/// the first record and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSchema {
    pub id: Uuid,
    pub job_id: Uuid,
    pub file_name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl ImportSchema {
    pub fn new(job_id: Uuid, file_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            file_name: file_name.into(),
            columns,
        }
    }
}

/// One successfully parsed row of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    /// 1-based, assigned in parse order, gapless over successful rows
    pub row_number: i64,
    /// Column name -> nullable JSON scalar
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ImportRecord {
    pub fn new(
        job_id: Uuid,
        row_number: i64,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            row_number,
            data,
        }
    }
}

fn default_delimiter() -> char {
    ';'
}

fn default_batch_size() -> usize {
    1000
}

fn default_preview_rows() -> usize {
    10
}

/// Caller-supplied parsing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Field delimiter for delimited text formats
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Whether the first unskipped row names the columns
    #[serde(default)]
    pub has_header: bool,
    /// Rows dropped from the top of the file, before any header
    #[serde(default)]
    pub skip_rows: usize,
    /// Records per bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Workbook sheet to read; first sheet when absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    /// Rows returned by the preview endpoint
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: false,
            skip_rows: 0,
            batch_size: default_batch_size(),
            sheet_name: None,
            preview_rows: default_preview_rows(),
        }
    }
}

impl ParserOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !self.delimiter.is_ascii() {
            return Err("delimiter must be a single ASCII character".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.preview_rows == 0 {
            return Err("preview_rows must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// An accepted import waiting for a worker. Exists only between submission
/// and dequeue; never persisted.
#[derive(Debug, Clone)]
pub struct QueuedImport {
    pub job_id: Uuid,
    pub file_name: String,
    pub data: Arc<Vec<u8>>,
    pub options: ParserOptions,
}
