use thiserror::Error;

use matchng_core::DomainError;

/// Failure reported by a [`StorageBackend`](crate::backend::StorageBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The write would take the medium past its byte budget.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("storage backend error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was rejected for lack of space. Draft keys have already been
    /// purged; the write itself was not retried.
    #[error("quota exceeded writing `{key}` (drafts purged)")]
    QuotaExceeded {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to serialize value for `{key}`")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}
