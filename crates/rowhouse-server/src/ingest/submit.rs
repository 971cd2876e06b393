//! Import submission.
//!
//! Validates a file before any job exists: the payload must be non-empty
//! and a parser must be registered for the filename's extension. Accepted
//! files become a `Pending` job plus a queued task; the synchronous mode
//! additionally waits for the engine to reach a terminal state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use uuid::Uuid;

use super::queue::JobQueue;
use crate::error::{AppError, AppResult};
use crate::models::{ImportJob, ParserOptions, QueuedImport};
use crate::parser::{file_extension, ParserRegistry};
use crate::repo::JobRepository;

/// Poll cadence for synchronous submissions.
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A submission request: file bytes plus parsing options.
#[derive(Debug, Clone)]
pub struct SubmitParams {
    pub file_name: String,
    pub data: Vec<u8>,
    pub options: ParserOptions,
}

pub struct ImportSubmission {
    registry: Arc<ParserRegistry>,
    queue: JobQueue,
    jobs: Arc<dyn JobRepository>,
}

impl ImportSubmission {
    pub fn new(
        registry: Arc<ParserRegistry>,
        queue: JobQueue,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        Self {
            registry,
            queue,
            jobs,
        }
    }

    /// Reject unusable submissions before a job is created.
    fn validate(&self, params: &SubmitParams) -> AppResult<String> {
        if params.file_name.trim().is_empty() {
            return Err(AppError::Validation("file name is required".to_string()));
        }
        if params.data.is_empty() {
            return Err(AppError::EmptyInput);
        }
        params.options.validate().map_err(AppError::Validation)?;
        self.registry.resolve(&params.file_name)?;
        Ok(file_extension(&params.file_name).unwrap_or_default())
    }

    /// Asynchronous mode: create a `Pending` job, enqueue the task, return
    /// immediately. Blocks only while the queue is at capacity.
    pub async fn submit_async(&self, params: SubmitParams) -> AppResult<ImportJob> {
        let file_type = self.validate(&params)?;

        let job = ImportJob::new(&params.file_name, file_type, params.data.len() as i64);
        self.jobs.insert(&job).await?;

        let task = QueuedImport {
            job_id: job.id,
            file_name: params.file_name,
            data: Arc::new(params.data),
            options: params.options,
        };
        self.queue
            .enqueue(task)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!(
            job_id = %job.id,
            file = %job.file_name,
            size = job.file_size,
            "Import accepted"
        );
        Ok(job)
    }

    /// Synchronous mode: submit and wait for a terminal state; the payload
    /// is the final job record.
    pub async fn submit_sync(&self, params: SubmitParams) -> AppResult<ImportJob> {
        let job = self.submit_async(params).await?;
        self.wait_for_terminal(job.id).await
    }

    /// Poll the job repository until the job reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> AppResult<ImportJob> {
        let mut ticker = interval(SYNC_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            let job = self
                .jobs
                .find(job_id)
                .await?
                .ok_or_else(|| AppError::not_found("job", job_id))?;
            if job.is_terminal() {
                return Ok(job);
            }
        }
    }
}
