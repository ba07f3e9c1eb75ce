//! Keyed async locks.
//!
//! Two concerns need serialization beyond what transactions give us:
//! per-user mastery updates must apply in submission order, and adaptive
//! applies must be mutually exclusive per plan. A bounded map of
//! `Arc<Mutex<()>>` keyed by uuid covers both; entries nobody holds are
//! evicted once the map grows past its bound.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Entries are pruned once a keyspace exceeds this many locks.
const MAX_ENTRIES: usize = 1024;

#[derive(Default)]
struct KeyedLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            if map.len() > MAX_ENTRIES {
                // Only drop locks no task currently holds or awaits.
                map.retain(|_, v| Arc::strong_count(v) > 1);
            }
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Process-wide lock registry carried in `AppState`.
#[derive(Default)]
pub struct LockRegistry {
    users: KeyedLocks,
    plans: KeyedLocks,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes mastery updates for one user.
    pub async fn user_lock(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        self.users.acquire(user_id).await
    }

    /// Serializes adaptive applies (and anything else plan-mutating) for
    /// one plan.
    pub async fn plan_lock(&self, plan_id: Uuid) -> OwnedMutexGuard<()> {
        self.plans.acquire(plan_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let registry = LockRegistry::new();
        let key = Uuid::new_v4();
        let guard = registry.user_lock(key).await;
        // A second acquisition must not resolve while the first is held.
        let second = registry.user_lock(key);
        tokio::select! {
            _ = second => panic!("lock was not exclusive"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
        }
        drop(guard);
        // Now it resolves.
        let _ = registry.user_lock(key).await;
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let registry = LockRegistry::new();
        let _a = registry.user_lock(Uuid::new_v4()).await;
        let _b = registry.user_lock(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn test_user_and_plan_keyspaces_are_independent() {
        let registry = LockRegistry::new();
        let key = Uuid::new_v4();
        let _user = registry.user_lock(key).await;
        let _plan = registry.plan_lock(key).await;
    }
}
