//! Progress polling query
//!
//! Read-only projection of a job's counters; safe to call concurrently
//! with the worker's writes, and readers may observe intermediate counts.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::ingest::ImportProgress;
use crate::repo::{JobRepository, RepoError};

/// Query for a job's current progress projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetProgressQuery {
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetProgressError {
    #[error("Import job not found")]
    NotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl Request<Result<ImportProgress, GetProgressError>> for GetProgressQuery {}

pub async fn handle(
    jobs: Arc<dyn JobRepository>,
    query: GetProgressQuery,
) -> Result<ImportProgress, GetProgressError> {
    let job = jobs
        .find(query.job_id)
        .await?
        .ok_or(GetProgressError::NotFound)?;
    Ok(ImportProgress::from(&job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportJob;
    use crate::repo::Repositories;

    #[tokio::test]
    async fn test_progress_projection() {
        let repos = Repositories::in_memory();
        let mut job = ImportJob::new("orders.csv", "csv", 42);
        job.start();
        job.total_records = 10;
        job.processed_records = 5;
        repos.jobs.insert(&job).await.unwrap();

        let progress = handle(repos.jobs.clone(), GetProgressQuery { job_id: job.id })
            .await
            .unwrap();
        assert_eq!(progress.percent, 50.0);
    }
}
