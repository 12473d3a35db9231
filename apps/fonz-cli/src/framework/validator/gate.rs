//! Permit pool bounding the number of queries outstanding on the remote service.
//!
//! A permit is taken by a dispatcher right before it creates a query and given back by
//! the collector once that query reached a terminal outcome. Because acquire and
//! release happen in different tasks, permits are detached from their RAII guard and
//! returned explicitly.

use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, thiserror::Error)]
#[error("The concurrency gate was closed")]
pub struct GateClosed;

#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl ConcurrencyGate {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Waits for a free permit and keeps it until `release` is called.
    pub async fn acquire(&self) -> Result<(), GateClosed> {
        let permit = self.semaphore.acquire().await.map_err(|_| GateClosed)?;
        permit.forget();
        Ok(())
    }

    /// Returns one permit taken by `acquire`.
    pub fn release(&self) {
        if self.in_flight() > 0 {
            self.semaphore.add_permits(1);
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.size - self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_acquire_until_exhausted() {
        let gate = ConcurrencyGate::new(2);
        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);

        let blocked = timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(blocked.is_err(), "a third acquire should wait");
    }

    #[tokio::test]
    async fn test_release_from_another_task_wakes_waiter() {
        let gate = ConcurrencyGate::new(1);
        gate.acquire().await.unwrap();

        let releaser = {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                gate.release();
            })
        };

        timeout(Duration::from_secs(1), gate.acquire())
            .await
            .expect("released permit should be handed to the waiter")
            .unwrap();
        releaser.await.unwrap();
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn test_release_never_grows_the_pool() {
        let gate = ConcurrencyGate::new(3);
        gate.release();
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.size(), 3);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(ConcurrencyGate::new(0).size(), 1);
    }
}
