//! In-process document backing.
//!
//! Jobs, schemas, and records live as JSON documents inside one store,
//! mirroring how a document database would hold them. Used when
//! `ROWHOUSE_STORAGE=memory` and as the backend for the test suites; state
//! does not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    JobRepository, RecordRepository, RepoError, RepoResult, SchemaRepository, SEARCH_RESULT_CAP,
};
use crate::models::{ImportJob, ImportRecord, ImportSchema};

#[derive(Default)]
struct Collections {
    /// Job documents by job id
    jobs: HashMap<Uuid, serde_json::Value>,
    /// Schema documents keyed by job id (unique per job)
    schemas: HashMap<Uuid, serde_json::Value>,
    /// Record documents per job, in insertion order
    records: HashMap<Uuid, Vec<serde_json::Value>>,
}

/// Cloneable handle over the shared document collections.
#[derive(Clone, Default)]
pub struct DocumentStore {
    inner: Arc<RwLock<Collections>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_document<T: serde::Serialize>(value: &T) -> RepoResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn from_document<T: serde::de::DeserializeOwned>(doc: &serde_json::Value) -> RepoResult<T> {
    Ok(serde_json::from_value(doc.clone())?)
}

#[async_trait]
impl JobRepository for DocumentStore {
    async fn insert(&self, job: &ImportJob) -> RepoResult<()> {
        let doc = to_document(job)?;
        self.inner.write().await.jobs.insert(job.id, doc);
        Ok(())
    }

    async fn update(&self, job: &ImportJob) -> RepoResult<()> {
        let doc = to_document(job)?;
        let mut guard = self.inner.write().await;
        if !guard.jobs.contains_key(&job.id) {
            return Err(RepoError::NotFound(format!("job '{}' not found", job.id)));
        }
        guard.jobs.insert(job.id, doc);
        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        total: i64,
        processed: i64,
        failed: i64,
    ) -> RepoResult<()> {
        let mut guard = self.inner.write().await;
        let doc = guard
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| RepoError::NotFound(format!("job '{job_id}' not found")))?;
        if let Some(object) = doc.as_object_mut() {
            object.insert("total_records".to_string(), total.into());
            object.insert("processed_records".to_string(), processed.into());
            object.insert("failed_records".to_string(), failed.into());
        }
        Ok(())
    }

    async fn find(&self, job_id: Uuid) -> RepoResult<Option<ImportJob>> {
        let guard = self.inner.read().await;
        guard.jobs.get(&job_id).map(from_document).transpose()
    }

    async fn list(&self, offset: i64, limit: i64) -> RepoResult<(Vec<ImportJob>, i64)> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<ImportJob> = guard
            .jobs
            .values()
            .map(from_document)
            .collect::<RepoResult<_>>()?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = jobs.len() as i64;
        let page = jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, job_id: Uuid) -> RepoResult<bool> {
        let mut guard = self.inner.write().await;
        let existed = guard.jobs.remove(&job_id).is_some();
        guard.schemas.remove(&job_id);
        guard.records.remove(&job_id);
        Ok(existed)
    }
}

#[async_trait]
impl SchemaRepository for DocumentStore {
    async fn insert(&self, schema: &ImportSchema) -> RepoResult<()> {
        let doc = to_document(schema)?;
        self.inner.write().await.schemas.insert(schema.job_id, doc);
        Ok(())
    }

    async fn find_by_job(&self, job_id: Uuid) -> RepoResult<Option<ImportSchema>> {
        let guard = self.inner.read().await;
        guard.schemas.get(&job_id).map(from_document).transpose()
    }
}

/// Render a stored scalar the way search compares it: strings as-is,
/// everything else through its JSON text form.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RecordRepository for DocumentStore {
    async fn bulk_insert(&self, records: &[ImportRecord]) -> RepoResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            docs.push((record.job_id, to_document(record)?));
        }
        let mut guard = self.inner.write().await;
        for (job_id, doc) in docs {
            guard.records.entry(job_id).or_default().push(doc);
        }
        Ok(())
    }

    async fn list_by_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<ImportRecord>, i64)> {
        let guard = self.inner.read().await;
        let mut records: Vec<ImportRecord> = guard
            .records
            .get(&job_id)
            .map(|docs| docs.iter().map(from_document).collect::<RepoResult<_>>())
            .transpose()?
            .unwrap_or_default();
        records.sort_by_key(|record| record.row_number);

        let total = records.len() as i64;
        let page = records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_by_job(&self, job_id: Uuid) -> RepoResult<i64> {
        let guard = self.inner.read().await;
        Ok(guard.records.get(&job_id).map(Vec::len).unwrap_or(0) as i64)
    }

    async fn delete_by_job(&self, job_id: Uuid) -> RepoResult<u64> {
        let mut guard = self.inner.write().await;
        Ok(guard.records.remove(&job_id).map(|docs| docs.len()).unwrap_or(0) as u64)
    }

    async fn search(&self, job_id: Uuid, term: &str) -> RepoResult<Vec<ImportRecord>> {
        let needle = term.to_lowercase();
        let guard = self.inner.read().await;
        let mut matches: Vec<ImportRecord> = Vec::new();
        if let Some(docs) = guard.records.get(&job_id) {
            for doc in docs {
                let record: ImportRecord = from_document(doc)?;
                let hit = record
                    .data
                    .values()
                    .any(|value| value_text(value).to_lowercase().contains(&needle));
                if hit {
                    matches.push(record);
                }
            }
        }
        matches.sort_by_key(|record| record.row_number);
        matches.truncate(SEARCH_RESULT_CAP);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportJob, ImportRecord};
    use serde_json::json;

    fn record(job_id: Uuid, row_number: i64, name: &str, qty: i64) -> ImportRecord {
        let mut data = serde_json::Map::new();
        data.insert("name".to_string(), json!(name));
        data.insert("qty".to_string(), json!(qty));
        ImportRecord::new(job_id, row_number, data)
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let store = DocumentStore::new();
        let job = ImportJob::new("orders.csv", "csv", 64);
        JobRepository::insert(&store, &job).await.unwrap();

        let found = store.find(job.id).await.unwrap().unwrap();
        assert_eq!(found.file_name, "orders.csv");
        assert_eq!(found.status, job.status);

        assert!(store.find(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_progress_touches_only_counters() {
        let store = DocumentStore::new();
        let mut job = ImportJob::new("orders.csv", "csv", 64);
        job.start();
        JobRepository::insert(&store, &job).await.unwrap();

        store.update_progress(job.id, 10, 4, 1).await.unwrap();
        let found = store.find(job.id).await.unwrap().unwrap();
        assert_eq!(found.total_records, 10);
        assert_eq!(found.processed_records, 4);
        assert_eq!(found.failed_records, 1);
        assert_eq!(found.status, crate::models::JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_records_read_back_in_row_order() {
        let store = DocumentStore::new();
        let job_id = Uuid::new_v4();
        let batch: Vec<ImportRecord> = (1..=5)
            .map(|i| record(job_id, i, &format!("row{i}"), i * 10))
            .collect();
        store.bulk_insert(&batch).await.unwrap();

        let (page, total) = store.list_by_job(job_id, 0, 10).await.unwrap();
        assert_eq!(total, 5);
        let rows: Vec<i64> = page.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![1, 2, 3, 4, 5]);

        let (page, _) = store.list_by_job(job_id, 2, 2).await.unwrap();
        let rows: Vec<i64> = page.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_per_value() {
        let store = DocumentStore::new();
        let job_id = Uuid::new_v4();
        store
            .bulk_insert(&[
                record(job_id, 1, "Widget", 3),
                record(job_id, 2, "gadget", 42),
                record(job_id, 3, "doohickey", 7),
            ])
            .await
            .unwrap();

        let hits = store.search(job_id, "GET").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row_number, 1);

        // Numeric values match through their text form.
        let hits = store.search(job_id, "42").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].row_number, 2);
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let store = DocumentStore::new();
        let job_id = Uuid::new_v4();
        let batch: Vec<ImportRecord> = (1..=150)
            .map(|i| record(job_id, i, "same", i))
            .collect();
        store.bulk_insert(&batch).await.unwrap();

        let hits = store.search(job_id, "same").await.unwrap();
        assert_eq!(hits.len(), SEARCH_RESULT_CAP);
        assert_eq!(hits[0].row_number, 1);
    }

    #[tokio::test]
    async fn test_delete_job_cascades() {
        let store = DocumentStore::new();
        let job = ImportJob::new("orders.csv", "csv", 64);
        JobRepository::insert(&store, &job).await.unwrap();

        let schema = crate::models::ImportSchema::new(job.id, "orders.csv", vec![]);
        SchemaRepository::insert(&store, &schema).await.unwrap();
        store
            .bulk_insert(&[record(job.id, 1, "one", 1)])
            .await
            .unwrap();

        assert!(store.delete(job.id).await.unwrap());
        assert!(store.find(job.id).await.unwrap().is_none());
        assert!(store.find_by_job(job.id).await.unwrap().is_none());
        assert_eq!(store.count_by_job(job.id).await.unwrap(), 0);

        // Deleting again reports absence.
        assert!(!store.delete(job.id).await.unwrap());
    }
}
