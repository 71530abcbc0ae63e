use std::sync::Arc;

use tracing::info;

use matchng_core::{Session, UserId};

use super::now_millis;
use crate::error::StoreError;
use crate::key::keys;
use crate::store::PersistentStore;

/// The signed-in user of this instance, persisted under the `session` key.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<PersistentStore>,
}

impl SessionStore {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self { store }
    }

    pub async fn start(&self, user_id: UserId) -> Result<Session, StoreError> {
        let session = Session::new(user_id, now_millis());
        self.store.set_item(keys::SESSION, &session).await?;
        info!(user_id = %session.user_id, "session started");
        Ok(session)
    }

    pub async fn current(&self) -> Result<Option<Session>, StoreError> {
        self.store.get_item(keys::SESSION).await
    }

    pub async fn end(&self) -> Result<(), StoreError> {
        self.store.remove_item(keys::SESSION).await
    }
}
