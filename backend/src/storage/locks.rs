use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per (user, project). Mutations inside a project run one at a time.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<Mutex<HashMap<(i64, String), Arc<AsyncMutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: i64, project: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks
                .entry((user_id, project.to_string()))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drops the entry for a project that no longer exists under this name.
    pub fn forget(&self, user_id: i64, project: &str) {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = (user_id, project.to_string());
        if locks
            .get(&key)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false)
        {
            locks.remove(&key);
        }
    }
}
