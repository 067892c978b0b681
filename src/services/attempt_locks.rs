//! Per-(quiz, user) mutual exclusion for attempt lifecycle operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::errors::{AppError, AppResult};

const PRUNE_THRESHOLD: usize = 1024;

pub struct AttemptLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

impl AttemptLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn key(quiz_id: &str, user_id: &str) -> String {
        format!("{}:{}", quiz_id, user_id)
    }

    /// Waits up to the configured timeout, then reports `Conflict`.
    pub async fn acquire(&self, quiz_id: &str, user_id: &str) -> AppResult<OwnedMutexGuard<()>> {
        let key = Self::key(quiz_id, user_id);
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| AppError::InternalError("attempt lock table poisoned".to_string()))?;
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                log::warn!("Timed out waiting for attempt lock {}", key);
                AppError::Conflict(format!(
                    "Another operation on quiz '{}' for user '{}' is in progress",
                    quiz_id, user_id
                ))
            })
    }
}
