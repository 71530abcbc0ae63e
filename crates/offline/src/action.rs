//! Deferred mutations and their persisted shape.

use serde::{Deserialize, Serialize};

use matchng_core::{ActionId, JobId, Session, UserId};

/// What a pending action does to the user's profile when replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Union-insert the job into `applied_job_ids`.
    Apply,
    /// Toggle the job in `saved_job_ids`.
    SaveJob,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Apply => "APPLY",
            ActionKind::SaveJob => "SAVE_JOB",
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `PENDING → IN_FLIGHT → {removed | PENDING | dead-lettered}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    /// Being replayed. Seen at the start of a run, it means the previous run
    /// died mid-action, and it is treated as `Pending`.
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    pub job_id: JobId,
    /// The user the action was recorded for; replay applies it to them.
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub payload: ActionPayload,
    /// Epoch milliseconds of the enqueue.
    pub timestamp: i64,
    pub retry_count: u32,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingAction {
    pub fn new(session: &Session, action: NewAction, now_ms: i64) -> Self {
        Self {
            id: ActionId::new(),
            kind: action.kind,
            payload: ActionPayload {
                job_id: action.job_id,
                user_id: session.user_id.clone(),
            },
            timestamp: now_ms,
            retry_count: 0,
            status: ActionStatus::Pending,
            next_attempt_at: None,
            last_error: None,
        }
    }

    /// Backoff has elapsed (or there never was one).
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now_ms)
    }

    /// Actions with the same target must replay in enqueue order.
    pub fn target(&self) -> (UserId, JobId) {
        (self.payload.user_id.clone(), self.payload.job_id.clone())
    }
}

/// A mutation to record, before it gets an id and a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub kind: ActionKind,
    pub job_id: JobId,
}

impl NewAction {
    pub fn apply(job_id: JobId) -> Self {
        Self {
            kind: ActionKind::Apply,
            job_id,
        }
    }

    pub fn save_job(job_id: JobId) -> Self {
        Self {
            kind: ActionKind::SaveJob,
            job_id,
        }
    }
}

/// An action that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub action: PendingAction,
    pub dead_lettered_at: i64,
    pub reason: String,
}
