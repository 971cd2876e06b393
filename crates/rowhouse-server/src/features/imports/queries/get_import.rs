//! Get import query
//!
//! Query to fetch a single import job by id.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ImportJob;
use crate::repo::{JobRepository, RepoError};

/// Query to get an import job by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetImportQuery {
    pub job_id: Uuid,
}

/// Wire form of an import job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJobDetails {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub total_records: i64,
    pub processed_records: i64,
    pub failed_records: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<ImportJob> for ImportJobDetails {
    fn from(job: ImportJob) -> Self {
        let duration_ms = job.duration().map(|d| d.num_milliseconds());
        Self {
            id: job.id,
            file_name: job.file_name,
            file_type: job.file_type,
            file_size: job.file_size,
            total_records: job.total_records,
            processed_records: job.processed_records,
            failed_records: job.failed_records,
            status: job.status.as_str().to_string(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            duration_ms,
            error_message: job.error_message,
        }
    }
}

/// Error type for the get import query
#[derive(Debug, thiserror::Error)]
pub enum GetImportError {
    #[error("Import job not found")]
    NotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl Request<Result<ImportJobDetails, GetImportError>> for GetImportQuery {}

pub async fn handle(
    jobs: Arc<dyn JobRepository>,
    query: GetImportQuery,
) -> Result<ImportJobDetails, GetImportError> {
    let job = jobs
        .find(query.job_id)
        .await?
        .ok_or(GetImportError::NotFound)?;
    Ok(job.into())
}
