//! Read-only progress projection for external pollers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ImportJob, JobStatus};

/// Derived view over a job's counters; a pure function of job state.
#[derive(Debug, Clone, Serialize)]
pub struct ImportProgress {
    pub job_id: Uuid,
    pub total: i64,
    pub processed: i64,
    pub failed: i64,
    pub percent: f64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&ImportJob> for ImportProgress {
    fn from(job: &ImportJob) -> Self {
        let percent = if job.total_records == 0 {
            0.0
        } else {
            job.processed_records as f64 * 100.0 / job.total_records as f64
        };

        Self {
            job_id: job.id,
            total: job.total_records,
            processed: job.processed_records,
            failed: job.failed_records,
            percent,
            status: job.status,
            started_at: job.started_at,
            completed_at: job.completed_at,
            duration_ms: job.duration().map(|d| d.num_milliseconds()),
            error_message: job.error_message.clone(),
        }
    }
}
