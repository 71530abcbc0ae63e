//! Applying one pending action to the profile it was recorded for.

use matchng_core::UserProfile;
use matchng_store::{StoreError, UserRepository};

use crate::action::{ActionKind, PendingAction};

/// Replay `action` against its user.
///
/// `APPLY` is idempotent; replaying it again leaves a single entry.
/// `SAVE_JOB` is a toggle, so callers must never replay the same entry twice
/// after it succeeded (the queue removes it on success).
pub async fn apply_action(
    users: &UserRepository,
    action: &PendingAction,
) -> Result<UserProfile, StoreError> {
    let job_id = action.payload.job_id.clone();
    users
        .update_user(&action.payload.user_id, |user| match action.kind {
            ActionKind::Apply => {
                user.apply_to(job_id);
            }
            ActionKind::SaveJob => {
                user.toggle_saved(job_id);
            }
        })
        .await
}
