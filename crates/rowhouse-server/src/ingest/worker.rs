//! Ingestion worker pool.
//!
//! Dequeues pending imports and executes them with bounded concurrency:
//! each job holds one of `max_concurrent_jobs` semaphore permits for its
//! whole run. A transient failure in the main loop is logged and backed off,
//! never fatal; shutdown cancels the dequeue and then awaits every in-flight
//! job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::pipeline::{self, JobCounters};
use super::queue::JobQueueReceiver;
use crate::config::IngestConfig;
use crate::models::{ImportSchema, QueuedImport};
use crate::parser::{ParserRegistry, SchemaDetector};
use crate::repo::Repositories;

/// Pause after an unexpected main-loop error.
const LOOP_BACKOFF: Duration = Duration::from_millis(500);

pub struct IngestWorkerPool {
    receiver: JobQueueReceiver,
    registry: Arc<ParserRegistry>,
    repos: Repositories,
    max_concurrent_jobs: usize,
    row_buffer_capacity: usize,
    cancel: CancellationToken,
}

/// Handle over a started pool; cancels and drains on shutdown.
pub struct WorkerPoolHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl WorkerPoolHandle {
    /// Signal shutdown and wait for in-flight imports to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Worker pool task ended abnormally");
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl IngestWorkerPool {
    pub fn new(
        receiver: JobQueueReceiver,
        registry: Arc<ParserRegistry>,
        repos: Repositories,
        config: &IngestConfig,
    ) -> Self {
        Self {
            receiver,
            registry,
            repos,
            max_concurrent_jobs: config.max_concurrent_jobs,
            row_buffer_capacity: config.row_buffer_capacity,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the pool's main loop.
    pub fn start(self) -> WorkerPoolHandle {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(self.run());
        WorkerPoolHandle { cancel, handle }
    }

    async fn run(mut self) {
        tracing::info!(
            max_concurrent_jobs = self.max_concurrent_jobs,
            "Ingestion worker pool started"
        );
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_jobs));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            match self.step(&semaphore, &mut in_flight).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Worker loop error, backing off");
                    tokio::time::sleep(LOOP_BACKOFF).await;
                }
            }
        }

        if !in_flight.is_empty() {
            tracing::info!(in_flight = in_flight.len(), "Draining in-flight imports");
        }
        while in_flight.join_next().await.is_some() {}
        tracing::info!("Ingestion worker pool stopped");
    }

    /// One loop iteration: acquire a permit, dequeue, launch. `Ok(false)`
    /// means shutdown.
    async fn step(
        &mut self,
        semaphore: &Arc<Semaphore>,
        in_flight: &mut JoinSet<()>,
    ) -> Result<bool> {
        // Reap whatever finished since the last pass.
        while in_flight.try_join_next().is_some() {}

        let permit = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(false),
            permit = semaphore.clone().acquire_owned() => {
                permit.context("worker semaphore closed")?
            }
        };

        let Some(task) = self.receiver.dequeue(&self.cancel).await else {
            drop(permit);
            return Ok(false);
        };

        let registry = self.registry.clone();
        let repos = self.repos.clone();
        let cancel = self.cancel.clone();
        let buffer_capacity = self.row_buffer_capacity;
        in_flight.spawn(async move {
            let job_id = task.job_id;
            if let Err(e) = execute_job(task, registry, repos, cancel, buffer_capacity).await {
                tracing::error!(job_id = %job_id, error = %e, "Import execution failed");
            }
            drop(permit);
        });

        Ok(true)
    }
}

/// Execute one import end to end.
///
/// Stage failures (parser resolution, schema detection, pipeline errors)
/// terminate the job as `Failed` with the message; per-row failures are
/// only counted. On shutdown mid-job the last persisted state stands and
/// the job remains visible as stale `Processing`.
pub async fn execute_job(
    task: QueuedImport,
    registry: Arc<ParserRegistry>,
    repos: Repositories,
    cancel: CancellationToken,
    row_buffer_capacity: usize,
) -> Result<()> {
    let Some(mut job) = repos.jobs.find(task.job_id).await? else {
        tracing::warn!(job_id = %task.job_id, "Dequeued task references a missing job");
        return Ok(());
    };

    tracing::info!(job_id = %job.id, file = %job.file_name, "Starting import");
    let counters = Arc::new(JobCounters::new());

    let outcome = run_stages(
        &mut job,
        &task,
        &registry,
        &repos,
        &counters,
        &cancel,
        row_buffer_capacity,
    )
    .await;

    if cancel.is_cancelled() && outcome.is_ok() {
        let snapshot = counters.snapshot();
        repos
            .jobs
            .update_progress(job.id, snapshot.total, snapshot.processed, snapshot.failed)
            .await?;
        tracing::warn!(job_id = %job.id, "Import interrupted by shutdown");
        return Ok(());
    }

    match outcome {
        Ok(()) => {
            let snapshot = counters.snapshot();
            job.complete(snapshot.total, snapshot.processed, snapshot.failed);
            tracing::info!(
                job_id = %job.id,
                total = snapshot.total,
                processed = snapshot.processed,
                failed = snapshot.failed,
                status = %job.status,
                "Import finished"
            );
        }
        Err(ref e) => {
            job.fail(format!("{e:#}"));
            tracing::error!(job_id = %job.id, error = %e, "Import failed");
        }
    }

    repos.jobs.update(&job).await?;
    Ok(())
}

/// Steps 2-5 of an import: resolve parser, detect and persist the schema,
/// move to `Processing`, run the streaming pipeline.
async fn run_stages(
    job: &mut crate::models::ImportJob,
    task: &QueuedImport,
    registry: &Arc<ParserRegistry>,
    repos: &Repositories,
    counters: &Arc<JobCounters>,
    cancel: &CancellationToken,
    row_buffer_capacity: usize,
) -> Result<()> {
    let parser = registry.resolve(&task.file_name)?;

    let detected = SchemaDetector::new(registry.clone())
        .detect(&task.file_name, &task.data, &task.options)
        .context("schema detection failed")?;
    tracing::debug!(
        job_id = %job.id,
        columns = detected.columns.len(),
        estimated_rows = detected.estimated_rows,
        "Schema detected"
    );

    let schema = ImportSchema::new(job.id, &task.file_name, detected.columns);
    repos
        .schemas
        .insert(&schema)
        .await
        .context("failed to persist schema")?;

    job.total_records = detected.estimated_rows;
    job.start();
    repos
        .jobs
        .update(job)
        .await
        .context("failed to move job to processing")?;

    pipeline::run(
        job.id,
        parser,
        task.data.clone(),
        task.options.clone(),
        repos,
        counters.clone(),
        cancel,
        row_buffer_capacity,
    )
    .await
}
