//! Records with identity that outlive individual state changes.

/// Entity marker + minimal interface.
///
/// Profiles and jobs are never deleted; a newer version saved under the same
/// id supersedes the old one, so the id is the only stable handle.
pub trait Entity {
    /// Strongly-typed identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the identifier.
    fn id(&self) -> &Self::Id;
}
