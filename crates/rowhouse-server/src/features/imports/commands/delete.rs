//! Delete import command
//!
//! Removes a job together with its schema and all of its records.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repo::{RepoError, Repositories};

/// Command to delete an import job and everything it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImportCommand {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImportResponse {
    pub job_id: Uuid,
    pub records_deleted: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteImportError {
    #[error("Import job not found")]
    NotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl Request<Result<DeleteImportResponse, DeleteImportError>> for DeleteImportCommand {}

pub async fn handle(
    repos: Repositories,
    command: DeleteImportCommand,
) -> Result<DeleteImportResponse, DeleteImportError> {
    let records_deleted = repos.records.count_by_job(command.job_id).await?;

    // Schema and records cascade with the job row.
    if !repos.jobs.delete(command.job_id).await? {
        return Err(DeleteImportError::NotFound);
    }

    tracing::info!(
        job_id = %command.job_id,
        records_deleted,
        "Import deleted"
    );
    Ok(DeleteImportResponse {
        job_id: command.job_id,
        records_deleted,
    })
}
