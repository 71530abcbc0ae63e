//! `matchng-store` — offline-durable persistence for matchNG.
//!
//! - [`PersistentStore`]: namespaced, versioned, obfuscating key/value store
//!   over a pluggable [`StorageBackend`] (in-memory or SQLite).
//! - [`DebouncedWriter`]: last-value-wins coalescing of rapid writes.
//! - [`SqliteChangeFeed`]: change signals between processes sharing one
//!   SQLite store.
//! - Repositories for users, jobs and the session.
//!
//! Every write fires a [`Topic::StoreChanged`](matchng_events::Topic) signal
//! through the store's [`SyncNotifier`](matchng_events::SyncNotifier).

pub mod backend;
pub mod codec;
pub mod config;
pub mod debounce;
pub mod envelope;
pub mod error;
pub mod feed;
pub mod key;
pub mod repo;
pub mod store;

pub use backend::{MemoryBackend, SqliteBackend, StorageBackend};
pub use config::StoreConfig;
pub use debounce::DebouncedWriter;
pub use envelope::StorageEnvelope;
pub use error::{BackendError, StoreError};
pub use feed::SqliteChangeFeed;
pub use key::{KeySpace, keys};
pub use repo::{ConflictPolicy, JobRepository, SessionStore, UserRepository};
pub use store::PersistentStore;
