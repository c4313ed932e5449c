use crate::error::{LedgerError, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Per-key async mutexes.
///
/// Keys are locked independently; [`LockTable::acquire_all`] takes several
/// keys in ascending order so two callers locking the same pair can never
/// deadlock. Every acquisition is bounded by `timeout`.
pub struct LockTable<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
    timeout: Duration,
}

/// Held locks. Dropping it releases them.
#[must_use]
pub struct LockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Ord + Copy + Display,
{
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    async fn slot(&self, key: K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    pub async fn acquire(&self, key: K) -> Result<LockGuard> {
        self.acquire_all(&[key]).await
    }

    pub async fn acquire_all(&self, keys: &[K]) -> Result<LockGuard> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            let slot = self.slot(key).await;
            let guard = tokio::time::timeout(self.timeout, slot.lock_owned())
                .await
                .map_err(|_| {
                    LedgerError::ConflictError(format!(
                        "Timed out after {:?} waiting for lock on {key}",
                        self.timeout
                    ))
                })?;
            debug!(%key, "lock acquired");
            guards.push(guard);
        }
        Ok(LockGuard { _guards: guards })
    }

    /// Drops lock slots nobody is holding or waiting on.
    pub async fn prune(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    #[cfg(test)]
    pub(crate) async fn slots(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out() {
        let table = LockTable::new(Duration::from_millis(20));
        let _held = table.acquire(1u32).await.unwrap();
        let result = table.acquire(1u32).await;
        assert!(matches!(result, Err(LedgerError::ConflictError(_))));
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let table = LockTable::new(Duration::from_millis(20));
        let held = table.acquire_all(&[2u32, 1u32]).await.unwrap();
        drop(held);
        assert!(table.acquire(1u32).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_keys_locked_once() {
        let table = LockTable::new(Duration::from_millis(20));
        assert!(table.acquire_all(&[3u32, 3u32]).await.is_ok());
    }

    #[tokio::test]
    async fn test_opposite_order_does_not_deadlock() {
        let table = Arc::new(LockTable::new(Duration::from_secs(2)));
        let mut handles = Vec::new();
        for i in 0..50u32 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                let keys = if i % 2 == 0 { [1u32, 2u32] } else { [2u32, 1u32] };
                let _guard = table.acquire_all(&keys).await?;
                tokio::task::yield_now().await;
                Ok::<_, LedgerError>(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_prune_keeps_held_slots() {
        let table = LockTable::new(Duration::from_millis(20));
        let held = table.acquire(1u32).await.unwrap();
        drop(table.acquire(2u32).await.unwrap());
        table.prune().await;
        assert_eq!(table.locks.lock().await.len(), 1);
        drop(held);
    }
}
