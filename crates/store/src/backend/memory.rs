use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{StorageBackend, entry_cost};
use crate::error::BackendError;

/// In-memory medium for tests, previews and ephemeral sessions.
///
/// Clones share the same map, so several stores built over clones of one
/// backend behave like instances sharing one storage medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes taking total usage past `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        let backend = Self::default();
        backend.lock().quota = Some(quota);
        backend
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes in use, by the same rule the quota uses.
    pub fn used_bytes(&self) -> u64 {
        self.lock()
            .entries
            .iter()
            .map(|(k, v)| entry_cost(k, v))
            .sum()
    }

    /// Write without quota checks or envelopes. Useful for seeding legacy or
    /// corrupted data.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().entries.insert(key.into(), value.into());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(quota) = state.quota {
            let others: u64 = state
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_cost(k, v))
                .sum();
            let needed = others + entry_cost(key, value);
            if needed > quota {
                return Err(BackendError::QuotaExceeded { needed, quota });
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.lock().entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.lock().entries.keys().cloned().collect())
    }
}
