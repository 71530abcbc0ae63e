use thiserror::Error;

use matchng_core::ActionId;
use matchng_store::StoreError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no dead-lettered action with id {0}")]
    DeadLetterNotFound(ActionId),
}

impl QueueError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, QueueError::Store(err) if err.is_quota_exceeded())
    }
}
