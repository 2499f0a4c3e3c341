use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type KeyLock = Arc<AsyncMutex<()>>;

/// Prune idle entries once the table grows past this many keys.
const PRUNE_AT: usize = 1024;

/// Per-`(page_key, id)` async locks.
///
/// Writers to the same fingerprint key run one at a time; different keys
/// never wait on each other.
#[derive(Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<(String, String), KeyLock>>,
}

/// Held locks; released on drop.
pub struct KeyGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, page_key: &str, id: &str) -> KeyGuards {
        self.lock_many(page_key, &[id]).await
    }

    /// Lock several ids of one page. Ids are deduplicated and acquired in
    /// sorted order so two callers locking overlapping sets cannot deadlock.
    pub async fn lock_many(&self, page_key: &str, ids: &[&str]) -> KeyGuards {
        let mut sorted: Vec<&str> = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let locks: Vec<KeyLock> = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.len() > PRUNE_AT {
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            sorted
                .iter()
                .map(|id| {
                    table
                        .entry((page_key.to_string(), id.to_string()))
                        .or_default()
                        .clone()
                })
                .collect()
        };

        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }

        KeyGuards { _guards: guards }
    }

    pub fn tracked_keys(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
