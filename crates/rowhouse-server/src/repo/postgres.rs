//! PostgreSQL repositories.
//!
//! Schema and record payloads are stored as JSONB; bulk inserts go through
//! multi-row `INSERT .. VALUES` statements built with `QueryBuilder`, chunked
//! to stay under the bind-parameter limit. Cascade deletion of a job's
//! schema and records is enforced by foreign keys (see `migrations/`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

use super::{
    JobRepository, RecordRepository, RepoError, RepoResult, SchemaRepository, SEARCH_RESULT_CAP,
};
use crate::models::{ImportJob, ImportRecord, ImportSchema, JobStatus};

/// Rows per multi-row insert statement (4 binds per record).
const INSERT_CHUNK_ROWS: usize = 200;

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    file_name: String,
    file_type: String,
    file_size: i64,
    total_records: i64,
    processed_records: i64,
    failed_records: i64,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl From<JobRow> for ImportJob {
    fn from(row: JobRow) -> Self {
        ImportJob {
            id: row.id,
            file_name: row.file_name,
            file_type: row.file_type,
            file_size: row.file_size,
            total_records: row.total_records,
            processed_records: row.processed_records,
            failed_records: row.failed_records,
            status: JobStatus::from(row.status),
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        }
    }
}

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: &ImportJob) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs (
                id, file_name, file_type, file_size,
                total_records, processed_records, failed_records,
                status, created_at, started_at, completed_at, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id)
        .bind(&job.file_name)
        .bind(&job.file_type)
        .bind(job.file_size)
        .bind(job.total_records)
        .bind(job.processed_records)
        .bind(job.failed_records)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, job: &ImportJob) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET total_records = $2,
                processed_records = $3,
                failed_records = $4,
                status = $5,
                started_at = $6,
                completed_at = $7,
                error_message = $8
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.total_records)
        .bind(job.processed_records)
        .bind(job.failed_records)
        .bind(job.status.as_str())
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("job '{}' not found", job.id)));
        }
        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        total: i64,
        processed: i64,
        failed: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE import_jobs
            SET total_records = $2,
                processed_records = $3,
                failed_records = $4
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(total)
        .bind(processed)
        .bind(failed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, job_id: Uuid) -> RepoResult<Option<ImportJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, file_name, file_type, file_size,
                   total_records, processed_records, failed_records,
                   status, created_at, started_at, completed_at, error_message
            FROM import_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ImportJob::from))
    }

    async fn list(&self, offset: i64, limit: i64) -> RepoResult<(Vec<ImportJob>, i64)> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, file_name, file_type, file_size,
                   total_records, processed_records, failed_records,
                   status, created_at, started_at, completed_at, error_message
            FROM import_jobs
            ORDER BY created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_jobs")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(ImportJob::from).collect(), total))
    }

    async fn delete(&self, job_id: Uuid) -> RepoResult<bool> {
        // import_schemas and import_records reference import_jobs with
        // ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM import_jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PgSchemaRepository {
    pool: PgPool,
}

impl PgSchemaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaRepository for PgSchemaRepository {
    async fn insert(&self, schema: &ImportSchema) -> RepoResult<()> {
        let columns = serde_json::to_value(&schema.columns)?;
        sqlx::query(
            r#"
            INSERT INTO import_schemas (id, job_id, file_name, columns)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(schema.id)
        .bind(schema.job_id)
        .bind(&schema.file_name)
        .bind(columns)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_job(&self, job_id: Uuid) -> RepoResult<Option<ImportSchema>> {
        let row = sqlx::query(
            r#"
            SELECT id, job_id, file_name, columns
            FROM import_schemas
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let columns: serde_json::Value = row.try_get("columns")?;
            Ok(ImportSchema {
                id: row.try_get("id")?,
                job_id: row.try_get("job_id")?,
                file_name: row.try_get("file_name")?,
                columns: serde_json::from_value(columns)?,
            })
        })
        .transpose()
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    job_id: Uuid,
    row_number: i64,
    data: serde_json::Value,
}

impl From<RecordRow> for ImportRecord {
    fn from(row: RecordRow) -> Self {
        let data = match row.data {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        ImportRecord {
            id: row.id,
            job_id: row.job_id,
            row_number: row.row_number,
            data,
        }
    }
}

pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn bulk_insert(&self, records: &[ImportRecord]) -> RepoResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO import_records (id, job_id, row_number, data) ",
            );
            builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.id)
                    .push_bind(record.job_id)
                    .push_bind(record.row_number)
                    .push_bind(serde_json::Value::Object(record.data.clone()));
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<ImportRecord>, i64)> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, job_id, row_number, data
            FROM import_records
            WHERE job_id = $1
            ORDER BY row_number ASC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(job_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total = self.count_by_job(job_id).await?;
        Ok((rows.into_iter().map(ImportRecord::from).collect(), total))
    }

    async fn count_by_job(&self, job_id: Uuid) -> RepoResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM import_records WHERE job_id = $1")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn delete_by_job(&self, job_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM import_records WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn search(&self, job_id: Uuid, term: &str) -> RepoResult<Vec<ImportRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, job_id, row_number, data
            FROM import_records
            WHERE job_id = $1
              AND EXISTS (
                  SELECT 1 FROM jsonb_each_text(data) AS kv
                  WHERE kv.value ILIKE '%' || $2 || '%'
              )
            ORDER BY row_number ASC
            LIMIT $3
            "#,
        )
        .bind(job_id)
        .bind(term)
        .bind(SEARCH_RESULT_CAP as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ImportRecord::from).collect())
    }
}
