//! List imports query

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::get_import::ImportJobDetails;
use crate::features::shared::pagination::{PageParams, Paginated};
use crate::repo::{JobRepository, RepoError};

/// Query to list import jobs, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListImportsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Request<Result<Paginated<ImportJobDetails>, RepoError>> for ListImportsQuery {}

pub async fn handle(
    jobs: Arc<dyn JobRepository>,
    query: ListImportsQuery,
) -> Result<Paginated<ImportJobDetails>, RepoError> {
    let params = PageParams::new(query.page, query.page_size);
    let (items, total) = jobs.list(params.offset(), params.page_size()).await?;
    let items = items.into_iter().map(ImportJobDetails::from).collect();
    Ok(Paginated::from_items(items, &params, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportJob;
    use crate::repo::Repositories;

    #[tokio::test]
    async fn test_list_imports_paginates() {
        let repos = Repositories::in_memory();
        for i in 0..5 {
            let job = ImportJob::new(format!("file{i}.csv"), "csv", 10);
            repos.jobs.insert(&job).await.unwrap();
        }

        let page = handle(
            repos.jobs.clone(),
            ListImportsQuery {
                page: Some(1),
                page_size: Some(2),
            },
        )
        .await
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 3);
    }
}
