//! In-memory FIFO of pending job records.
//!
//! The queue is a transient, non-authoritative copy of what the store holds as
//! `PENDING`. Producers call [`JobQueue::enqueue`] from any thread; the single
//! worker drains it with [`JobQueue::recv`], which parks until a record arrives or
//! the stop token is cancelled.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use taskq_core::JobRecord;

/// Thread-safe, unbounded FIFO queue.
///
/// One lock guards the sequence. It is held for a single push/pop (or a copy, for
/// `snapshot`) and never while a handler runs or a store write is in flight.
#[derive(Debug, Default)]
pub struct JobQueue {
    records: Mutex<VecDeque<JobRecord>>,
    available: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the tail. Never blocks beyond lock contention.
    pub fn enqueue(&self, record: JobRecord) {
        self.lock().push_back(record);
        self.available.notify_one();
    }

    /// Remove and return the head, or `None` if the queue is empty. Never blocks.
    pub fn dequeue(&self) -> Option<JobRecord> {
        self.lock().pop_front()
    }

    /// Copy of the current contents, head first.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for the next record.
    ///
    /// Returns `None` once `stop` is cancelled, even if records are still queued:
    /// they stay where they are.
    pub async fn recv(&self, stop: &CancellationToken) -> Option<JobRecord> {
        loop {
            if stop.is_cancelled() {
                return None;
            }
            if let Some(record) = self.dequeue() {
                return Some(record);
            }

            // `notify_one` stores a permit when nobody is waiting, so an enqueue
            // landing between the dequeue above and this await is not lost.
            tokio::select! {
                biased;
                _ = stop.cancelled() => return None,
                _ = self.available.notified() => {}
            }
        }
    }

    // Push/pop cannot leave the deque half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<JobRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn record(job_type: &str) -> JobRecord {
        JobRecord::new(job_type, "{}")
    }

    #[test]
    fn dequeue_on_empty_queue_returns_none() {
        let queue = JobQueue::new();
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn dequeues_in_enqueue_order() {
        let queue = JobQueue::new();
        let (a, b, c) = (record("a"), record("b"), record("c"));
        queue.enqueue(a.clone());
        queue.enqueue(b.clone());
        queue.enqueue(c.clone());

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue().unwrap().id, a.id);
        assert_eq!(queue.dequeue().unwrap().id, b.id);
        assert_eq!(queue.dequeue().unwrap().id, c.id);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let queue = JobQueue::new();
        queue.enqueue(record("a"));
        queue.enqueue(record("b"));

        let snapshot = queue.snapshot();
        queue.dequeue();
        queue.enqueue(record("c"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].job_type, "a");
        assert_eq!(snapshot[1].job_type, "b");
        assert_eq!(queue.snapshot()[1].job_type, "c");
    }

    #[test]
    fn concurrent_producers_lose_and_duplicate_nothing() {
        const PRODUCERS: usize = 32;
        let queue = Arc::new(JobQueue::new());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|i| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let job = record(&format!("producer-{i}"));
                    let id = job.id;
                    queue.enqueue(job);
                    id
                })
            })
            .collect();
        let submitted: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut drained = Vec::new();
        while let Some(job) = queue.dequeue() {
            drained.push(job.id);
        }

        assert_eq!(drained.len(), PRODUCERS);
        let unique: HashSet<_> = drained.into_iter().collect();
        assert_eq!(unique, submitted);
    }

    #[tokio::test]
    async fn recv_wakes_when_a_record_is_enqueued() {
        let queue = Arc::new(JobQueue::new());
        let stop = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let stop = stop.clone();
            tokio::spawn(async move { queue.recv(&stop).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let job = record("late");
        let id = job.id;
        queue.enqueue(job);

        let received = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("recv did not wake up")
            .unwrap();
        assert_eq!(received.map(|j| j.id), Some(id));
    }

    #[tokio::test]
    async fn recv_returns_none_when_stopped_while_idle() {
        let queue = Arc::new(JobQueue::new());
        let stop = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let stop = stop.clone();
            tokio::spawn(async move { queue.recv(&stop).await })
        };

        stop.cancel();
        let received = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("recv ignored the stop token")
            .unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn recv_leaves_records_queued_after_stop() {
        let queue = JobQueue::new();
        let stop = CancellationToken::new();
        queue.enqueue(record("left-behind"));

        stop.cancel();
        assert!(queue.recv(&stop).await.is_none());
        assert_eq!(queue.len(), 1);
    }
}
