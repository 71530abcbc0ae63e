//! Durable queue of mutations recorded while offline.
//!
//! Entries live under the `queue` key as one ordered list; dead letters live
//! under `queue:dead`. All read-modify-write cycles on either list go through
//! one async mutex, so enqueues issued during a replay never get lost.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use matchng_core::{ActionId, Session};
use matchng_store::{PersistentStore, UserRepository, keys};

use crate::action::{ActionStatus, DeadLetter, NewAction, PendingAction};
use crate::error::QueueError;
use crate::replay::apply_action;
use crate::retry::RetryPolicy;

/// Outcome counts of one [`ActionQueue::replay_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Applied and removed from the queue.
    pub applied: usize,
    /// Failed and scheduled for another attempt.
    pub retried: usize,
    /// Failed for the last time and moved to the dead-letter list.
    pub dead_lettered: usize,
    /// Still backing off; left for a later run.
    pub not_due: usize,
    /// Held back behind an earlier entry for the same user and job.
    pub deferred: usize,
}

impl ReplayReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn attempted(&self) -> usize {
        self.applied + self.retried + self.dead_lettered
    }
}

/// Clears the replay flag however the run ends.
struct ReplayGuard<'a>(&'a AtomicBool);

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct ActionQueue {
    store: Arc<PersistentStore>,
    users: Arc<UserRepository>,
    policy: RetryPolicy,
    /// Stand-in for network latency between replayed actions.
    replay_delay: Duration,
    lock: Mutex<()>,
    replaying: AtomicBool,
}

impl ActionQueue {
    pub fn new(
        store: Arc<PersistentStore>,
        users: Arc<UserRepository>,
        policy: RetryPolicy,
        replay_delay: Duration,
    ) -> Self {
        Self {
            store,
            users,
            policy,
            replay_delay,
            lock: Mutex::new(()),
            replaying: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Record `action` for the session's user.
    pub async fn enqueue(
        &self,
        session: &Session,
        action: NewAction,
    ) -> Result<PendingAction, QueueError> {
        let _guard = self.lock.lock().await;

        let entry = PendingAction::new(session, action, now_millis());
        let mut queue = self.load().await?;
        queue.push(entry.clone());
        self.save(&queue).await?;

        info!(
            action_id = %entry.id,
            kind = %entry.kind,
            job_id = %entry.payload.job_id,
            user_id = %entry.payload.user_id,
            queued = queue.len(),
            "action queued"
        );
        Ok(entry)
    }

    /// Every queued entry, in insertion order.
    pub async fn list_pending(&self) -> Result<Vec<PendingAction>, QueueError> {
        self.load().await
    }

    pub async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// Replay every due entry in insertion order.
    ///
    /// Returns an empty report straight away when another replay is already
    /// running in this instance.
    pub async fn replay_all(&self) -> Result<ReplayReport, QueueError> {
        if self.replaying.swap(true, Ordering::AcqRel) {
            debug!("replay already running, skipping");
            return Ok(ReplayReport::default());
        }
        let _running = ReplayGuard(&self.replaying);

        let ids: Vec<ActionId> = self.load().await?.iter().map(|a| a.id).collect();
        if ids.is_empty() {
            return Ok(ReplayReport::default());
        }
        info!(queued = ids.len(), "replaying queued actions");

        let mut report = ReplayReport::default();
        let mut blocked = HashSet::new();

        for id in ids {
            let entry = {
                let _guard = self.lock.lock().await;
                let mut queue = self.load().await?;
                let Some(entry) = queue.iter_mut().find(|a| a.id == id) else {
                    continue;
                };

                let target = entry.target();
                if blocked.contains(&target) {
                    debug!(action_id = %id, "deferred behind an earlier entry for the same job");
                    report.deferred += 1;
                    continue;
                }
                if !entry.is_due(now_millis()) {
                    debug!(action_id = %id, next_attempt_at = ?entry.next_attempt_at, "not due yet");
                    blocked.insert(target);
                    report.not_due += 1;
                    continue;
                }

                entry.status = ActionStatus::InFlight;
                let entry = entry.clone();
                self.save(&queue).await?;
                entry
            };

            if !self.replay_delay.is_zero() {
                tokio::time::sleep(self.replay_delay).await;
            }

            let result = apply_action(&self.users, &entry).await;

            let _guard = self.lock.lock().await;
            let mut queue = self.load().await?;
            let Some(pos) = queue.iter().position(|a| a.id == id) else {
                continue;
            };

            match result {
                Ok(_) => {
                    queue.remove(pos);
                    self.save(&queue).await?;
                    report.applied += 1;
                    info!(action_id = %id, kind = %entry.kind, "action replayed");
                }
                Err(err) => {
                    blocked.insert(entry.target());

                    let now = now_millis();
                    let failed = &mut queue[pos];
                    failed.retry_count += 1;
                    failed.last_error = Some(err.to_string());
                    warn!(
                        action_id = %id,
                        kind = %entry.kind,
                        retry_count = failed.retry_count,
                        error = %err,
                        "action replay failed"
                    );

                    if self.policy.should_retry(failed.retry_count) {
                        let delay = self.policy.delay_for_attempt(failed.retry_count);
                        failed.status = ActionStatus::Pending;
                        failed.next_attempt_at = Some(now + delay.as_millis() as i64);
                        self.save(&queue).await?;
                        report.retried += 1;
                    } else {
                        let mut action = queue.remove(pos);
                        action.status = ActionStatus::Pending;
                        let letter = DeadLetter {
                            action,
                            dead_lettered_at: now,
                            reason: err.to_string(),
                        };
                        // Append the dead letter first: a crash in between
                        // leaves a duplicate, never a lost action.
                        let mut dead = self.load_dead().await?;
                        dead.push(letter);
                        self.save_dead(&dead).await?;
                        self.save(&queue).await?;
                        report.dead_lettered += 1;
                        warn!(action_id = %id, "action dead-lettered after exhausting retries");
                    }
                }
            }
        }

        info!(
            applied = report.applied,
            retried = report.retried,
            dead_lettered = report.dead_lettered,
            not_due = report.not_due,
            deferred = report.deferred,
            "replay finished"
        );
        Ok(report)
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        self.load_dead().await
    }

    /// Move a dead letter back to the end of the queue with a fresh retry
    /// budget.
    pub async fn requeue_dead_letter(&self, id: ActionId) -> Result<PendingAction, QueueError> {
        let _guard = self.lock.lock().await;

        let mut dead = self.load_dead().await?;
        let pos = dead
            .iter()
            .position(|d| d.action.id == id)
            .ok_or(QueueError::DeadLetterNotFound(id))?;

        let mut action = dead.remove(pos).action;
        action.retry_count = 0;
        action.status = ActionStatus::Pending;
        action.next_attempt_at = None;
        action.last_error = None;

        let mut queue = self.load().await?;
        queue.push(action.clone());
        self.save(&queue).await?;
        self.save_dead(&dead).await?;

        info!(action_id = %id, "dead letter requeued");
        Ok(action)
    }

    /// Drop every dead letter. Returns how many there were.
    pub async fn clear_dead_letters(&self) -> Result<usize, QueueError> {
        let _guard = self.lock.lock().await;
        let count = self.load_dead().await?.len();
        self.store.remove_item(keys::DEAD_LETTERS).await?;
        Ok(count)
    }

    async fn load(&self) -> Result<Vec<PendingAction>, QueueError> {
        Ok(self
            .store
            .get_item::<Vec<PendingAction>>(keys::QUEUE)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, queue: &[PendingAction]) -> Result<(), QueueError> {
        self.store.set_item(keys::QUEUE, queue).await?;
        Ok(())
    }

    async fn load_dead(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self
            .store
            .get_item::<Vec<DeadLetter>>(keys::DEAD_LETTERS)
            .await?
            .unwrap_or_default())
    }

    async fn save_dead(&self, dead: &[DeadLetter]) -> Result<(), QueueError> {
        self.store.set_item(keys::DEAD_LETTERS, dead).await?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
