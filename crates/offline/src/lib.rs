//! `matchng-offline` — mutations that survive losing the network.
//!
//! [`JobActions`] is the entry point for `apply` and `toggle_save`. Online,
//! they write through the user repository; offline, they land in the
//! [`ActionQueue`]. The [`SyncCoordinator`] replays the queue once the
//! [`ConnectivityMonitor`] sees the network again, with bounded exponential
//! backoff and a dead-letter list for actions that keep failing.

pub mod action;
pub mod actions;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod queue;
pub mod replay;
pub mod retry;
pub mod sync;

pub use action::{ActionKind, ActionPayload, ActionStatus, DeadLetter, NewAction, PendingAction};
pub use actions::{JobActions, MutationOutcome};
pub use config::OfflineConfig;
pub use connectivity::{
    ConnectivityMonitor, ConnectivityProbe, ConnectivityState, HttpProbe, ManualProbe, Transition,
};
pub use error::QueueError;
pub use queue::{ActionQueue, ReplayReport};
pub use replay::apply_action;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use sync::{SyncCoordinator, SyncTick, SyncWorker, SyncWorkerHandle};
