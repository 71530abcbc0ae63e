//! Raw key/value media behind the [`PersistentStore`](crate::PersistentStore).
//!
//! Backends store opaque strings. Envelopes, obfuscation and namespacing are
//! the store's job; quota enforcement is the backend's.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;

use crate::error::BackendError;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Insert or replace. Fails with [`BackendError::QuotaExceeded`] when the
    /// medium would go over budget; the previous value is then untouched.
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), BackendError>;

    async fn keys(&self) -> Result<Vec<String>, BackendError>;
}

/// Bytes an entry occupies: UTF-16 code units of key and value, two bytes
/// each (the way browser storage accounts for it).
pub fn entry_cost(key: &str, value: &str) -> u64 {
    ((key.encode_utf16().count() + value.encode_utf16().count()) * 2) as u64
}
