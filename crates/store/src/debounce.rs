//! Coalescing of rapid writes to the same key.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::store::PersistentStore;

#[derive(Debug)]
struct Pending {
    generation: u64,
    value: Value,
}

type PendingMap = Arc<Mutex<BTreeMap<String, Pending>>>;

/// Delays writes by `window` and keeps only the last value per key.
///
/// Every `schedule` call restarts that key's window. Writes happen on a
/// spawned tokio task, so `schedule` must be called from inside a runtime.
/// Errors from those background writes are logged, not returned; call
/// [`flush`](Self::flush) where the caller needs to know.
#[derive(Debug)]
pub struct DebouncedWriter {
    store: Arc<PersistentStore>,
    window: Duration,
    pending: PendingMap,
    generation: AtomicU64,
}

impl DebouncedWriter {
    pub fn new(store: Arc<PersistentStore>, window: Duration) -> Self {
        Self {
            store,
            window,
            pending: Arc::new(Mutex::new(BTreeMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Queue `value` for `key`, replacing anything still waiting.
    ///
    /// Only serialization can fail here.
    pub fn schedule<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        lock(&self.pending).insert(key.to_string(), Pending { generation, value });
        debug!(key, generation, "write scheduled");

        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let window = self.window;
        let key = key.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let due = {
                let mut map = lock(&pending);
                let latest = map.get(&key).map(|p| p.generation);
                // A newer schedule owns the key now; its own task will write.
                if latest == Some(generation) {
                    map.remove(&key)
                } else {
                    None
                }
            };

            if let Some(p) = due {
                if let Err(err) = store.set_item(&key, &p.value).await {
                    error!(key = %key, error = %err, "debounced write failed");
                }
            }
        });

        Ok(())
    }

    /// Debounced [`PersistentStore::save_draft`]: form autosave goes through
    /// here so every keystroke does not hit the medium.
    pub fn schedule_draft<T>(&self, id: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        self.schedule(&self.store.key_space().draft(id), value)
    }

    /// Cancel any pending write for draft `id`, then remove the stored copy.
    pub async fn discard_draft(&self, id: &str) -> Result<(), StoreError> {
        lock(&self.pending).remove(&self.store.key_space().draft(id));
        self.store.discard_draft(id).await
    }

    /// Write everything still waiting, now. Every pending key is attempted;
    /// the first error is returned.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let drained = std::mem::take(&mut *lock(&self.pending));

        let mut first_err = None;
        for (key, p) in drained {
            if let Err(err) = self.store.set_item(&key, &p.value).await {
                error!(key = %key, error = %err, "flushed write failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Keys waiting for their window to close.
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }
}

fn lock(map: &PendingMap) -> std::sync::MutexGuard<'_, BTreeMap<String, Pending>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}
