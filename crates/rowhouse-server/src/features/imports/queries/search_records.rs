//! Record search query
//!
//! Case-insensitive substring search over a job's stored values, capped at
//! 100 results.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::list_records::RecordView;
use crate::repo::{RepoError, Repositories};

/// Query to search a job's records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecordsQuery {
    pub job_id: Uuid,
    pub term: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchRecordsError {
    #[error("Search term is required and cannot be empty")]
    TermRequired,
    #[error("Import job not found")]
    JobNotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl Request<Result<Vec<RecordView>, SearchRecordsError>> for SearchRecordsQuery {}

pub async fn handle(
    repos: Repositories,
    query: SearchRecordsQuery,
) -> Result<Vec<RecordView>, SearchRecordsError> {
    let term = query.term.trim();
    if term.is_empty() {
        return Err(SearchRecordsError::TermRequired);
    }
    if repos.jobs.find(query.job_id).await?.is_none() {
        return Err(SearchRecordsError::JobNotFound);
    }

    let records = repos.records.search(query.job_id, term).await?;
    Ok(records.into_iter().map(RecordView::from).collect())
}
