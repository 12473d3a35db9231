//! Unbounded FIFO queue with join semantics
//!
//! Every item put on the queue counts as unfinished until a consumer calls
//! `task_done` for it. `join` waits for the unfinished count to reach zero, which
//! includes items put on the queue after `join` was called. This is what lets the
//! validator wait for a bisection tree whose size is unknown up front.
//!
//! ## Usage
//!
//! ```text
//! let queue = WorkQueue::new();
//! queue.put(item);
//! // consumer:
//! let item = queue.get().await;
//! // ... handle it, possibly putting more items ...
//! queue.task_done();
//! // producer:
//! queue.join().await;
//! ```

use tokio::sync::{mpsc, watch, Mutex};
use tracing::warn;

use super::query::Query;

/// Items consumed by dispatchers
#[derive(Debug)]
pub enum WorkItem {
    Query(Query),
    /// Tells one dispatcher to exit
    Shutdown,
}

pub struct WorkQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
    unfinished: watch::Sender<usize>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (unfinished, _) = watch::channel(0);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            unfinished,
        }
    }

    pub fn put(&self, item: T) {
        self.unfinished.send_modify(|count| *count += 1);
        // The queue owns the receiver, so the channel cannot be closed while `self` lives.
        if self.sender.send(item).is_err() {
            self.unfinished.send_modify(|count| *count -= 1);
        }
    }

    /// Waits for the next item. Concurrent consumers are served in arrival order.
    ///
    /// Returns `None` only if the channel was closed, which cannot happen while the
    /// queue is alive.
    pub async fn get(&self) -> Option<T> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Waits for at least one item, then takes whatever else is immediately available,
    /// up to `max` items in total.
    pub async fn get_batch(&self, max: usize) -> Vec<T> {
        let mut receiver = self.receiver.lock().await;
        let mut batch = Vec::new();
        if let Some(first) = receiver.recv().await {
            batch.push(first);
        }
        while batch.len() < max.max(1) {
            match receiver.try_recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
        }
        batch
    }

    /// Marks one previously taken item as fully handled.
    pub fn task_done(&self) {
        self.unfinished.send_modify(|count| {
            if *count == 0 {
                warn!("task_done called more times than items were put on the queue");
            } else {
                *count -= 1;
            }
        });
    }

    /// Number of items put but not yet marked done
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Waits until every item ever put has been marked done.
    pub async fn join(&self) {
        let mut receiver = self.unfinished.subscribe();
        // The sender lives in `self`, so waiting cannot fail.
        let _ = receiver.wait_for(|count| *count == 0).await;
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_join_returns_immediately_when_empty() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        timeout(Duration::from_millis(100), queue.join())
            .await
            .expect("join should not wait on an empty queue");
    }

    #[tokio::test]
    async fn test_items_come_out_in_order() {
        let queue = WorkQueue::new();
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.get().await, Some(1));
        assert_eq!(queue.get().await, Some(2));
        assert_eq!(queue.get().await, Some(3));
        assert_eq!(queue.unfinished(), 3);
    }

    #[tokio::test]
    async fn test_join_waits_for_task_done_not_get() {
        let queue = Arc::new(WorkQueue::new());
        queue.put("a");
        let _ = queue.get().await;

        let waiting = timeout(Duration::from_millis(50), queue.join()).await;
        assert!(waiting.is_err(), "join must wait until the item is marked done");

        queue.task_done();
        timeout(Duration::from_millis(100), queue.join())
            .await
            .expect("join should complete once the item is done");
    }

    #[tokio::test]
    async fn test_join_accounts_for_items_added_while_waiting() {
        let queue = Arc::new(WorkQueue::new());
        queue.put(2u32);

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut handled = 0;
                // Each item n > 0 spawns two items n - 1, like a bisection tree
                while let Some(n) = queue.get().await {
                    if n > 0 {
                        queue.put(n - 1);
                        queue.put(n - 1);
                    }
                    handled += 1;
                    queue.task_done();
                    if queue.unfinished() == 0 {
                        break;
                    }
                }
                handled
            })
        };

        timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join should see the whole tree finish");
        assert_eq!(consumer.await.unwrap(), 7);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_get_batch_takes_what_is_available() {
        let queue = WorkQueue::new();
        for i in 0..5 {
            queue.put(i);
        }
        assert_eq!(queue.get_batch(3).await, vec![0, 1, 2]);
        assert_eq!(queue.get_batch(10).await, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_get_batch_waits_for_first_item() {
        let queue = Arc::new(WorkQueue::new());
        let waiting = timeout(Duration::from_millis(50), queue.get_batch(10)).await;
        assert!(waiting.is_err(), "an empty queue should suspend the caller");

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                queue.put("late");
            })
        };
        let batch = timeout(Duration::from_secs(1), queue.get_batch(10))
            .await
            .unwrap();
        assert_eq!(batch, vec!["late"]);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_extra_task_done_does_not_underflow() {
        let queue: WorkQueue<u8> = WorkQueue::new();
        queue.task_done();
        assert_eq!(queue.unfinished(), 0);
    }
}
