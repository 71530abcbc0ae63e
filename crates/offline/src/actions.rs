//! The one place job mutations enter the system.

use std::sync::Arc;

use tracing::{info, warn};

use matchng_core::{ActionId, JobId, Session};
use matchng_store::{BackendError, StoreError, UserRepository};

use crate::action::{NewAction, PendingAction};
use crate::connectivity::ConnectivityMonitor;
use crate::error::QueueError;
use crate::queue::ActionQueue;
use crate::replay::apply_action;

/// What happened to a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Written to the profile.
    Applied,
    /// Recorded for replay once back online.
    Queued(ActionId),
}

/// Routes `apply` / `toggle_save` either straight to the user repository
/// (online) or into the [`ActionQueue`] (offline).
#[derive(Debug, Clone)]
pub struct JobActions {
    users: Arc<UserRepository>,
    queue: Arc<ActionQueue>,
    monitor: Arc<ConnectivityMonitor>,
}

impl JobActions {
    pub fn new(
        users: Arc<UserRepository>,
        queue: Arc<ActionQueue>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            users,
            queue,
            monitor,
        }
    }

    pub async fn apply(
        &self,
        session: &Session,
        job_id: JobId,
    ) -> Result<MutationOutcome, QueueError> {
        self.mutate(session, NewAction::apply(job_id)).await
    }

    pub async fn toggle_save(
        &self,
        session: &Session,
        job_id: JobId,
    ) -> Result<MutationOutcome, QueueError> {
        self.mutate(session, NewAction::save_job(job_id)).await
    }

    async fn mutate(
        &self,
        session: &Session,
        action: NewAction,
    ) -> Result<MutationOutcome, QueueError> {
        if !self.monitor.is_online() {
            return self.enqueue(session, action).await;
        }

        // Same code path as replay, so online and offline mutations agree.
        let immediate = PendingAction::new(session, action.clone(), 0);
        match apply_action(&self.users, &immediate).await {
            Ok(_) => {
                info!(
                    kind = %action.kind,
                    job_id = %action.job_id,
                    user_id = %session.user_id,
                    "mutation applied"
                );
                Ok(MutationOutcome::Applied)
            }
            Err(StoreError::Backend(BackendError::Io(reason))) => {
                warn!(
                    kind = %action.kind,
                    job_id = %action.job_id,
                    %reason,
                    "online write failed, queueing instead"
                );
                self.enqueue(session, action).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn enqueue(
        &self,
        session: &Session,
        action: NewAction,
    ) -> Result<MutationOutcome, QueueError> {
        let entry = self.queue.enqueue(session, action).await?;
        info!(action_id = %entry.id, kind = %entry.kind, "mutation queued");
        Ok(MutationOutcome::Queued(entry.id))
    }
}
