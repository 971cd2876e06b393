//! End-to-end ingestion tests against the in-memory document backing:
//! submit a file, let the worker pool run the full pipeline, inspect the
//! terminal job, its schema, and its records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rowhouse_common::ColumnType;
use rowhouse_server::config::IngestConfig;
use rowhouse_server::ingest::{job_queue, ImportSubmission, IngestWorkerPool, WorkerPoolHandle};
use rowhouse_server::models::{ImportRecord, JobStatus, ParserOptions};
use rowhouse_server::parser::ParserRegistry;
use rowhouse_server::repo::{RecordRepository, RepoResult, Repositories};
use serde_json::json;
use uuid::Uuid;

fn start_engine(repos: Repositories) -> (Arc<ImportSubmission>, WorkerPoolHandle) {
    let registry = Arc::new(ParserRegistry::new());
    let (queue, receiver) = job_queue(100);
    let submission = Arc::new(ImportSubmission::new(
        registry.clone(),
        queue,
        repos.jobs.clone(),
    ));
    let pool =
        IngestWorkerPool::new(receiver, registry, repos, &IngestConfig::default()).start();
    (submission, pool)
}

fn csv_options() -> ParserOptions {
    ParserOptions {
        delimiter: ',',
        has_header: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_csv_import_with_integer_columns() {
    let repos = Repositories::in_memory();
    let (submission, pool) = start_engine(repos.clone());

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "numbers.csv".to_string(),
            data: b"a,b,c\n1,2,3\n4,5,6\n".to_vec(),
            options: csv_options(),
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_records, 2);
    assert_eq!(job.processed_records, 2);
    assert_eq!(job.failed_records, 0);
    assert_eq!(job.file_type, "csv");
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let schema = repos.schemas.find_by_job(job.id).await.unwrap().unwrap();
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(schema
        .columns
        .iter()
        .all(|c| c.detected_type == ColumnType::Integer));

    let (records, total) = repos.records.list_by_job(job.id, 0, 10).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(records[0].row_number, 1);
    assert_eq!(records[0].data.get("a"), Some(&json!(1)));
    assert_eq!(records[0].data.get("b"), Some(&json!(2)));
    assert_eq!(records[0].data.get("c"), Some(&json!(3)));
    assert_eq!(records[1].row_number, 2);
    assert_eq!(records[1].data.get("a"), Some(&json!(4)));

    pool.shutdown().await;
}

#[tokio::test]
async fn test_mixed_column_imports_as_strings() {
    let repos = Repositories::in_memory();
    let (submission, pool) = start_engine(repos.clone());

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "mixed.csv".to_string(),
            data: b"x\n1\ntwo\n3\n".to_vec(),
            options: csv_options(),
        })
        .await
        .unwrap();

    // 2/3 integer share misses the 80% bar, so the column is a string.
    let schema = repos.schemas.find_by_job(job.id).await.unwrap().unwrap();
    assert_eq!(schema.columns[0].detected_type, ColumnType::String);

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.failed_records, 0);

    let (records, total) = repos.records.list_by_job(job.id, 0, 10).await.unwrap();
    assert_eq!(total, 3);
    let values: Vec<&serde_json::Value> =
        records.iter().map(|r| r.data.get("x").unwrap()).collect();
    assert_eq!(values, vec![&json!("1"), &json!("two"), &json!("3")]);

    pool.shutdown().await;
}

/// Counts bulk-insert calls while delegating to the real backing.
struct CountingRecords {
    inner: Arc<dyn RecordRepository>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RecordRepository for CountingRecords {
    async fn bulk_insert(&self, records: &[ImportRecord]) -> RepoResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk_insert(records).await
    }

    async fn list_by_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<ImportRecord>, i64)> {
        self.inner.list_by_job(job_id, offset, limit).await
    }

    async fn count_by_job(&self, job_id: Uuid) -> RepoResult<i64> {
        self.inner.count_by_job(job_id).await
    }

    async fn delete_by_job(&self, job_id: Uuid) -> RepoResult<u64> {
        self.inner.delete_by_job(job_id).await
    }

    async fn search(&self, job_id: Uuid, term: &str) -> RepoResult<Vec<ImportRecord>> {
        self.inner.search(job_id, term).await
    }
}

#[tokio::test]
async fn test_batching_issues_one_bulk_insert_per_full_batch() {
    let base = Repositories::in_memory();
    let calls = Arc::new(AtomicUsize::new(0));
    let repos = Repositories {
        jobs: base.jobs.clone(),
        schemas: base.schemas.clone(),
        records: Arc::new(CountingRecords {
            inner: base.records.clone(),
            calls: calls.clone(),
        }),
    };
    let (submission, pool) = start_engine(repos.clone());

    // 10,001 data rows with batch_size 1000: ten full batches plus the
    // residual row.
    let mut data = String::from("n\n");
    for i in 0..10_001 {
        data.push_str(&i.to_string());
        data.push('\n');
    }

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "large.csv".to_string(),
            data: data.into_bytes(),
            options: csv_options(),
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_records, 10_001);
    assert_eq!(job.processed_records, 10_001);
    assert_eq!(calls.load(Ordering::SeqCst), 11);

    let count = repos.records.count_by_job(job.id).await.unwrap();
    assert_eq!(count, 10_001);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_workbook_import_preserves_native_types() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_boolean(0, 0, true).unwrap();
    sheet.write_number(0, 1, 42).unwrap();
    sheet.write_boolean(1, 0, false).unwrap();
    sheet.write_number(1, 1, 3.14).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let repos = Repositories::in_memory();
    let (submission, pool) = start_engine(repos.clone());

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "cells.xlsx".to_string(),
            data: bytes,
            options: ParserOptions::default(),
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_records, 2);

    let schema = repos.schemas.find_by_job(job.id).await.unwrap().unwrap();
    assert_eq!(schema.columns[0].name, "Column1");
    assert_eq!(schema.columns[0].detected_type, ColumnType::Boolean);
    assert_eq!(schema.columns[1].name, "Column2");
    assert_eq!(schema.columns[1].detected_type, ColumnType::Decimal);

    let (records, _) = repos.records.list_by_job(job.id, 0, 10).await.unwrap();
    assert_eq!(records[0].data.get("Column1"), Some(&json!(true)));
    assert_eq!(records[0].data.get("Column2"), Some(&json!(42.0)));
    assert_eq!(records[1].data.get("Column1"), Some(&json!(false)));
    assert_eq!(records[1].data.get("Column2"), Some(&json!(3.14)));

    pool.shutdown().await;
}

#[tokio::test]
async fn test_undecodable_rows_complete_with_errors() {
    let repos = Repositories::in_memory();
    let (submission, pool) = start_engine(repos.clone());

    let mut data = b"a,b\n1,2\n".to_vec();
    data.extend_from_slice(&[0xFF, 0xFE]);
    data.extend_from_slice(b",3\n4,5\n");

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "dirty.csv".to_string(),
            data,
            options: csv_options(),
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::CompletedWithErrors);
    assert_eq!(job.total_records, 3);
    assert_eq!(job.processed_records, 2);
    assert_eq!(job.failed_records, 1);

    // processed + failed == total at the terminal state.
    assert_eq!(
        job.processed_records + job.failed_records,
        job.total_records
    );

    pool.shutdown().await;
}

#[tokio::test]
async fn test_rows_survive_round_trip_in_order() {
    let repos = Repositories::in_memory();
    let (submission, pool) = start_engine(repos.clone());

    let mut data = String::from("n,label\n");
    for i in 1..=250 {
        data.push_str(&format!("{i},row{i}\n"));
    }

    let job = submission
        .submit_sync(rowhouse_server::ingest::SubmitParams {
            file_name: "ordered.csv".to_string(),
            data: data.into_bytes(),
            options: ParserOptions {
                delimiter: ',',
                has_header: true,
                batch_size: 32,
                ..Default::default()
            },
        })
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);

    let (records, total) = repos.records.list_by_job(job.id, 0, 100).await.unwrap();
    assert_eq!(total, 250);
    let rows: Vec<i64> = records.iter().map(|r| r.row_number).collect();
    assert_eq!(rows, (1..=100).collect::<Vec<i64>>());
    assert_eq!(records[41].data.get("label"), Some(&json!("row42")));

    pool.shutdown().await;
}
