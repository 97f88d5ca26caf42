//! Per-category lock map for index updates.
//!
//! Incremental index updates must serialize concurrent writers for the
//! same category: acquire the lock keyed on the canonical category path,
//! read, mutate, write, release. Acquisition retries with exponential
//! back-off under a total timeout; hitting the timeout surfaces as
//! `LockTimeout`, which the engine reports as `INDEX_UPDATE_FAILED`
//! without rolling back the memory write.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StorageError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// Default total time to wait for one category lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Lock map keyed by canonical category path.
pub struct PathLockMap {
    locks: DashMap<String, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl PathLockMap {
    pub fn new(timeout: Duration) -> Self {
        PathLockMap {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Acquire the lock for a key, retrying with back-off until the total
    /// timeout elapses.
    pub async fn acquire(&self, key: &str) -> Result<OwnedMutexGuard<()>, StorageError> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            if let Ok(guard) = lock.clone().try_lock_owned() {
                return Ok(guard);
            }
            if tokio::time::Instant::now() + backoff > deadline {
                return Err(StorageError::LockTimeout {
                    category: key.to_string(),
                });
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }
}

impl Default for PathLockMap {
    fn default() -> Self {
        PathLockMap::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_is_reentrant_across_keys() {
        tokio_test::block_on(async {
            let locks = PathLockMap::default();
            let a = locks.acquire("a").await.unwrap();
            let b = locks.acquire("b").await.unwrap();
            drop(a);
            drop(b);
        });
    }

    #[tokio::test]
    async fn contended_lock_waits_for_release() {
        let locks = Arc::new(PathLockMap::default());
        let guard = locks.acquire("notes").await.unwrap();

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move { locks2.acquire("notes").await.map(|_| ()) });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn timeout_reports_the_category() {
        let locks = PathLockMap::new(Duration::from_millis(40));
        let _held = locks.acquire("busy").await.unwrap();
        let err = locks.acquire("busy").await.unwrap_err();
        match err {
            StorageError::LockTimeout { category } => assert_eq!(category, "busy"),
            other => panic!("expected LockTimeout, got {other:?}"),
        }
    }
}
