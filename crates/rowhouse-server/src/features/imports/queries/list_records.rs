//! List records query
//!
//! Pages through a job's imported rows, ascending by row number.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::shared::pagination::{PageParams, Paginated};
use crate::models::ImportRecord;
use crate::repo::{RepoError, Repositories};

/// Query for a page of a job's records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRecordsQuery {
    pub job_id: Uuid,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Wire form of an imported row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordView {
    pub row_number: i64,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl From<ImportRecord> for RecordView {
    fn from(record: ImportRecord) -> Self {
        Self {
            row_number: record.row_number,
            data: record.data,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListRecordsError {
    #[error("Import job not found")]
    JobNotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl Request<Result<Paginated<RecordView>, ListRecordsError>> for ListRecordsQuery {}

pub async fn handle(
    repos: Repositories,
    query: ListRecordsQuery,
) -> Result<Paginated<RecordView>, ListRecordsError> {
    if repos.jobs.find(query.job_id).await?.is_none() {
        return Err(ListRecordsError::JobNotFound);
    }

    let params = PageParams::new(query.page, query.page_size);
    let (records, total) = repos
        .records
        .list_by_job(query.job_id, params.offset(), params.page_size())
        .await?;
    let items = records.into_iter().map(RecordView::from).collect();
    Ok(Paginated::from_items(items, &params, total))
}
