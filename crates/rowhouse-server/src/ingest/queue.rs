//! Bounded FIFO of pending imports.
//!
//! Enqueue blocks when the queue is full, pushing backpressure onto
//! submission; dequeue blocks when empty and races the pool's cancellation
//! token. Multiple submitters may enqueue concurrently; the worker pool is
//! the single consumer.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::QueuedImport;

/// Create a queue of the given capacity, returning the submitter handle and
/// the single receiver.
pub fn job_queue(capacity: usize) -> (JobQueue, JobQueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (JobQueue { tx }, JobQueueReceiver { rx })
}

#[derive(Debug, thiserror::Error)]
#[error("ingestion queue is closed")]
pub struct QueueClosed;

/// Cloneable enqueue handle.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<QueuedImport>,
}

impl JobQueue {
    /// Enqueue a task, waiting while the queue is at capacity.
    pub async fn enqueue(&self, task: QueuedImport) -> Result<(), QueueClosed> {
        self.tx.send(task).await.map_err(|_| QueueClosed)
    }

    /// Tasks enqueued and not yet dequeued.
    pub fn pending_count(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// The queue's single consumer end, owned by the worker pool.
pub struct JobQueueReceiver {
    rx: mpsc::Receiver<QueuedImport>,
}

impl JobQueueReceiver {
    /// Next task in FIFO order; waits while the queue is empty. Returns
    /// `None` on cancellation or once every submitter handle is gone.
    pub async fn dequeue(&mut self, cancel: &CancellationToken) -> Option<QueuedImport> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            task = self.rx.recv() => task,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParserOptions, QueuedImport};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn task() -> QueuedImport {
        QueuedImport {
            job_id: Uuid::new_v4(),
            file_name: "orders.csv".to_string(),
            data: Arc::new(b"a\n1\n".to_vec()),
            options: ParserOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order_and_pending_count() {
        let (queue, mut receiver) = job_queue(10);
        let cancel = CancellationToken::new();

        let first = task();
        let second = task();
        queue.enqueue(first.clone()).await.unwrap();
        queue.enqueue(second.clone()).await.unwrap();
        assert_eq!(queue.pending_count(), 2);
        assert_eq!(receiver.pending_count(), 2);

        let out = receiver.dequeue(&cancel).await.unwrap();
        assert_eq!(out.job_id, first.job_id);
        assert_eq!(receiver.pending_count(), 1);

        let out = receiver.dequeue(&cancel).await.unwrap();
        assert_eq!(out.job_id, second.job_id);
        assert_eq!(receiver.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_blocks_when_full() {
        let (queue, mut receiver) = job_queue(2);
        let cancel = CancellationToken::new();

        queue.enqueue(task()).await.unwrap();
        queue.enqueue(task()).await.unwrap();

        // Third enqueue must wait for a dequeue.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), queue.enqueue(task())).await;
        assert!(blocked.is_err(), "enqueue should block at capacity");

        receiver.dequeue(&cancel).await.unwrap();
        tokio::time::timeout(Duration::from_millis(500), queue.enqueue(task()))
            .await
            .expect("enqueue should proceed after a dequeue")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dequeue_blocks_until_enqueue() {
        let (queue, mut receiver) = job_queue(2);
        let cancel = CancellationToken::new();

        let empty =
            tokio::time::timeout(Duration::from_millis(50), receiver.dequeue(&cancel)).await;
        assert!(empty.is_err(), "dequeue should block while empty");

        queue.enqueue(task()).await.unwrap();
        let out = tokio::time::timeout(Duration::from_millis(500), receiver.dequeue(&cancel))
            .await
            .expect("dequeue should complete after enqueue");
        assert!(out.is_some());
    }

    #[tokio::test]
    async fn test_dequeue_is_cancellable() {
        let (_queue, mut receiver) = job_queue(2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = tokio::time::timeout(Duration::from_millis(500), receiver.dequeue(&cancel))
            .await
            .expect("cancelled dequeue should return promptly");
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_fails_after_receiver_dropped() {
        let (queue, receiver) = job_queue(2);
        drop(receiver);
        assert!(queue.enqueue(task()).await.is_err());
    }
}
