//! `matchng-core` — domain building blocks shared by every matchNG crate.
//!
//! Pure data and invariants only; no storage, no IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod job;
pub mod location;
pub mod profile;
pub mod session;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ActionId, EmployerId, InstanceId, JobId, SkillId, UserId};
pub use job::{Job, JobStatus};
pub use location::Location;
pub use profile::{Role, UserProfile};
pub use session::Session;
