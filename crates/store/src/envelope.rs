use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Versioned wrapper around every persisted value.
///
/// Readers only accept envelopes whose `version` matches the running
/// [`STORAGE_VERSION`](crate::config::STORAGE_VERSION); anything else reads as
/// absent. There is no migration path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEnvelope<T> {
    pub version: u32,
    /// Epoch milliseconds of the write.
    pub timestamp: i64,
    pub data: T,
}

impl<T> StorageEnvelope<T> {
    pub fn new(version: u32, data: T) -> Self {
        Self {
            version,
            timestamp: Utc::now().timestamp_millis(),
            data,
        }
    }
}
