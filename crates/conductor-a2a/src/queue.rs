//! Per-agent execution queue.
//!
//! A FIFO of task ids with many producers (the protocol handler, one call per
//! accepted message) and a single consumer (the agent's executor). Dequeue
//! waits while the queue is empty and returns `None` once every sender is
//! gone or the receiver has been closed and drained.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{A2aError, A2aResult};

/// Create a connected sender/receiver pair.
pub fn execution_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        QueueSender {
            tx,
            depth: Arc::clone(&depth),
        },
        QueueReceiver { rx, depth },
    )
}

/// Producer half of the execution queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<String>,
    depth: Arc<AtomicUsize>,
}

impl QueueSender {
    /// Append a task id. Never blocks.
    pub fn enqueue(&self, task_id: impl Into<String>) -> A2aResult<()> {
        let task_id = task_id.into();
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task_id).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(A2aError::QueueClosed);
        }
        trace!(depth = self.depth(), "Enqueued task");
        Ok(())
    }

    /// Number of task ids waiting to be dequeued
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether the consumer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the execution queue.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<String>,
    depth: Arc<AtomicUsize>,
}

impl QueueReceiver {
    /// Wait for the next task id in FIFO order.
    pub async fn dequeue(&mut self) -> Option<String> {
        let task_id = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(task_id)
    }

    /// Stop accepting new ids; already queued ids can still be dequeued.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of task ids waiting to be dequeued
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = execution_queue();
        tx.enqueue("a").unwrap();
        tx.enqueue("b").unwrap();
        tx.enqueue("c").unwrap();
        assert_eq!(rx.depth(), 3);

        assert_eq!(rx.dequeue().await.as_deref(), Some("a"));
        assert_eq!(rx.dequeue().await.as_deref(), Some("b"));
        assert_eq!(rx.dequeue().await.as_deref(), Some("c"));
        assert_eq!(tx.depth(), 0);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_producer() {
        let (tx, mut rx) = execution_queue();

        let consumer = tokio::spawn(async move { rx.dequeue().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        tx.enqueue("late").unwrap();
        assert_eq!(consumer.await.unwrap().as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_dequeue_ends_when_senders_drop() {
        let (tx, mut rx) = execution_queue();
        tx.enqueue("last").unwrap();
        drop(tx);

        assert_eq!(rx.dequeue().await.as_deref(), Some("last"));
        assert_eq!(rx.dequeue().await, None);
    }

    #[tokio::test]
    async fn test_enqueue_after_close_fails() {
        let (tx, mut rx) = execution_queue();
        rx.close();

        assert!(tx.is_closed());
        assert!(matches!(tx.enqueue("x"), Err(A2aError::QueueClosed)));
        assert_eq!(tx.depth(), 0);
    }

    #[tokio::test]
    async fn test_many_producers() {
        let (tx, mut rx) = execution_queue();

        let mut handles = Vec::new();
        for i in 0..100 {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                tx.enqueue(format!("task-{}", i)).unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(tx);

        let mut seen = 0;
        while rx.dequeue().await.is_some() {
            seen += 1;
        }
        assert_eq!(seen, 100);
    }
}
