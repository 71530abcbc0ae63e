//! Typed collections on top of the [`PersistentStore`](crate::PersistentStore).
//!
//! Each repository keeps its whole collection under one logical key and
//! rewrites it on every change. Read-modify-write cycles are serialised per
//! repository; across instances sharing the medium the last writer wins,
//! tempered for profiles by [`ConflictPolicy`].

pub mod jobs;
pub mod session;
pub mod users;

pub use jobs::JobRepository;
pub use session::SessionStore;
pub use users::{ConflictPolicy, UserRepository};

use matchng_core::Entity;

/// Index of the record with `id`, if stored.
pub(crate) fn position_by_id<E: Entity>(items: &[E], id: &E::Id) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Epoch milliseconds, the unit used for every persisted timestamp.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
