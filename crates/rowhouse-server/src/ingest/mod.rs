//! The ingestion engine: bounded job queue, worker pool, and the streaming
//! producer/consumer pipeline that moves parsed rows into batched bulk
//! writes while the job state machine advances.

pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod submit;
pub mod worker;

pub use pipeline::JobCounters;
pub use progress::ImportProgress;
pub use queue::{job_queue, JobQueue, JobQueueReceiver};
pub use submit::{ImportSubmission, SubmitParams};
pub use worker::{IngestWorkerPool, WorkerPoolHandle};
