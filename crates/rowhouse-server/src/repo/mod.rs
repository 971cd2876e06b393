//! Persistence contracts for jobs, schemas, and records.
//!
//! The ingestion engine only sees these traits. Two families satisfy them:
//! a transactional PostgreSQL backing ([`postgres`]) and an in-process
//! document backing ([`memory`]); which one is live is a deployment choice.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ImportJob, ImportRecord, ImportSchema};

/// Upper bound on results returned by a record search.
pub const SEARCH_RESULT_CAP: usize = 100;

/// Repository operation errors
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to serialize stored document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// CRUD and listing over job metadata and state.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &ImportJob) -> RepoResult<()>;

    /// Persist the full job row, including its current state and counters.
    async fn update(&self, job: &ImportJob) -> RepoResult<()>;

    /// Write only the live counters onto the job row.
    async fn update_progress(
        &self,
        job_id: Uuid,
        total: i64,
        processed: i64,
        failed: i64,
    ) -> RepoResult<()>;

    async fn find(&self, job_id: Uuid) -> RepoResult<Option<ImportJob>>;

    /// Jobs newest-first, plus the total count.
    async fn list(&self, offset: i64, limit: i64) -> RepoResult<(Vec<ImportJob>, i64)>;

    /// Delete a job and, cascading, its schema and records. Returns whether
    /// the job existed.
    async fn delete(&self, job_id: Uuid) -> RepoResult<bool>;
}

/// Exactly one schema per job, written before the first record.
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    async fn insert(&self, schema: &ImportSchema) -> RepoResult<()>;
    async fn find_by_job(&self, job_id: Uuid) -> RepoResult<Option<ImportSchema>>;
}

/// Append-only bulk persistence of parsed rows.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Persist a batch through the backing store's native batch path,
    /// preserving `row_number` order on read-back.
    async fn bulk_insert(&self, records: &[ImportRecord]) -> RepoResult<()>;

    /// A page of records ascending by `row_number`, plus the total count.
    async fn list_by_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<ImportRecord>, i64)>;

    async fn count_by_job(&self, job_id: Uuid) -> RepoResult<i64>;

    async fn delete_by_job(&self, job_id: Uuid) -> RepoResult<u64>;

    /// Case-insensitive substring match over individual value fields,
    /// capped at [`SEARCH_RESULT_CAP`] results in `row_number` order.
    async fn search(&self, job_id: Uuid, term: &str) -> RepoResult<Vec<ImportRecord>>;
}

/// The repository trio handed to the engine and the HTTP surface.
#[derive(Clone)]
pub struct Repositories {
    pub jobs: Arc<dyn JobRepository>,
    pub schemas: Arc<dyn SchemaRepository>,
    pub records: Arc<dyn RecordRepository>,
}

impl Repositories {
    /// Transactional relational backing.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            jobs: Arc::new(postgres::PgJobRepository::new(pool.clone())),
            schemas: Arc::new(postgres::PgSchemaRepository::new(pool.clone())),
            records: Arc::new(postgres::PgRecordRepository::new(pool)),
        }
    }

    /// In-process document backing; also the test backend.
    pub fn in_memory() -> Self {
        let store = memory::DocumentStore::new();
        Self {
            jobs: Arc::new(store.clone()),
            schemas: Arc::new(store.clone()),
            records: Arc::new(store),
        }
    }
}
