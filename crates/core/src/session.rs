use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// The signed-in user of one application instance.
///
/// Passed explicitly into every operation that acts on behalf of a user; there
/// is no process-wide "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    /// Epoch milliseconds.
    pub started_at: i64,
}

impl Session {
    pub fn new(user_id: UserId, started_at: i64) -> Self {
        Self { user_id, started_at }
    }
}
