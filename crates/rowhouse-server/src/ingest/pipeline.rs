//! Streaming producer/consumer pipeline for one import.
//!
//! The producer walks the parser's lazy row sequence and pushes materialized
//! records into a bounded buffer, blocking when it is full; failed rows are
//! counted and dropped. The consumer drains the buffer into batches of
//! `batch_size`, bulk-inserts each batch, and writes the live counters onto
//! the job row. Cancellation stops the producer and lets the consumer flush
//! its current batch before exiting.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{ImportRecord, ParserOptions};
use crate::parser::TabularFileParser;
use crate::repo::{JobRepository, RecordRepository, Repositories};

/// Word-granular shared counters for one import.
#[derive(Debug, Default)]
pub struct JobCounters {
    total: AtomicI64,
    processed: AtomicI64,
    failed: AtomicI64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy)]
pub struct CountersSnapshot {
    pub total: i64,
    pub processed: i64,
    pub failed: i64,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            total: self.total.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Run producer and consumer to completion and surface the first error.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    job_id: Uuid,
    parser: Arc<dyn TabularFileParser>,
    data: Arc<Vec<u8>>,
    options: ParserOptions,
    repos: &Repositories,
    counters: Arc<JobCounters>,
    cancel: &CancellationToken,
    buffer_capacity: usize,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(buffer_capacity);

    let producer = spawn_producer(
        parser,
        data,
        options.clone(),
        job_id,
        tx,
        counters.clone(),
        cancel.clone(),
    );
    let consumer = spawn_consumer(
        rx,
        repos.records.clone(),
        repos.jobs.clone(),
        job_id,
        options.batch_size,
        counters,
        cancel.clone(),
    );

    let (producer_result, consumer_result) = tokio::join!(producer, consumer);
    producer_result.context("producer task panicked")??;
    consumer_result.context("consumer task panicked")??;
    Ok(())
}

/// Iterate the row stream, counting every yielded row and pushing successful
/// ones into the buffer. The buffer writer closes when this task returns.
pub(crate) fn spawn_producer(
    parser: Arc<dyn TabularFileParser>,
    data: Arc<Vec<u8>>,
    options: ParserOptions,
    job_id: Uuid,
    tx: mpsc::Sender<ImportRecord>,
    counters: Arc<JobCounters>,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let rows = parser
            .parse_stream(&data, &options)
            .context("failed to open row stream")?;

        for row in rows {
            if cancel.is_cancelled() {
                break;
            }
            counters.total.fetch_add(1, Ordering::SeqCst);

            match row.data {
                Some(data) if row.error.is_none() => {
                    let record = ImportRecord::new(job_id, row.row_number, data);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = tx.send(record) => {
                            if sent.is_err() {
                                // Consumer is gone; its error surfaces from
                                // the other join handle.
                                break;
                            }
                        }
                    }
                }
                _ => {
                    tracing::debug!(
                        job_id = %job_id,
                        row = row.row_number,
                        error = row.error.as_deref().unwrap_or("unknown"),
                        "Skipping malformed row"
                    );
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        Ok(())
    })
}

/// Drain the buffer into batches and bulk-insert them, publishing counters
/// onto the job row after every write.
pub(crate) fn spawn_consumer(
    mut rx: mpsc::Receiver<ImportRecord>,
    records: Arc<dyn RecordRepository>,
    jobs: Arc<dyn JobRepository>,
    job_id: Uuid,
    batch_size: usize,
    counters: Arc<JobCounters>,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut batch: Vec<ImportRecord> = Vec::with_capacity(batch_size);

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                record = rx.recv() => record,
            };
            match next {
                Some(record) => {
                    batch.push(record);
                    if batch.len() >= batch_size {
                        flush(&*records, &*jobs, job_id, &mut batch, &counters).await?;
                    }
                }
                None => break,
            }
        }

        // Residual rows flush the same way after the buffer closes, and on
        // cancellation the current batch still lands before exit.
        flush(&*records, &*jobs, job_id, &mut batch, &counters).await?;
        Ok(())
    })
}

async fn flush(
    records: &dyn RecordRepository,
    jobs: &dyn JobRepository,
    job_id: Uuid,
    batch: &mut Vec<ImportRecord>,
    counters: &JobCounters,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    records
        .bulk_insert(batch)
        .await
        .context("bulk insert failed")?;
    counters
        .processed
        .fetch_add(batch.len() as i64, Ordering::SeqCst);

    let snapshot = counters.snapshot();
    jobs.update_progress(job_id, snapshot.total, snapshot.processed, snapshot.failed)
        .await
        .context("failed to publish progress")?;

    tracing::debug!(
        job_id = %job_id,
        batch = batch.len(),
        processed = snapshot.processed,
        "Flushed record batch"
    );
    batch.clear();
    Ok(())
}
