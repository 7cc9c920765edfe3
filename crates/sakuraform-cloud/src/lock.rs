//! Process-wide named locks
//!
//! One async mutex per remote resource ID, created on first use and never
//! evicted, so the registry grows with the number of distinct IDs touched
//! during the process lifetime.
//!
//! This serializes read-modify-write cycles *within* one process only.
//! Another process (or a human in the control panel) editing the same
//! parent can still overwrite a concurrent change.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

static GLOBAL: LazyLock<Arc<NamedResourceMutex>> =
    LazyLock::new(|| Arc::new(NamedResourceMutex::new()));

/// Registry of locks keyed by resource ID
#[derive(Debug, Default)]
pub struct NamedResourceMutex {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NamedResourceMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every editor in this process
    pub fn global() -> Arc<NamedResourceMutex> {
        Arc::clone(&GLOBAL)
    }

    /// Wait for exclusive access to `key`
    ///
    /// The lock is released when the returned guard is dropped or
    /// [`NamedGuard::unlock`] is called.
    pub async fn lock(&self, key: &str) -> NamedGuard {
        let mutex = self.entry(key);
        tracing::debug!("Waiting for lock {}", key);
        let guard = mutex.lock_owned().await;
        tracing::debug!("Acquired lock {}", key);
        NamedGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys ever locked
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn entry(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.registry();
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        // the map is only ever inserted into, a poisoned guard still holds a valid map
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII guard for one named lock
#[derive(Debug)]
pub struct NamedGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for NamedGuard {
    fn drop(&mut self) {
        tracing::debug!("Released lock {}", self.key);
    }
}
