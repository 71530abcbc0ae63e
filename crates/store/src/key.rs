//! Key namespace: `<prefix>:v<version>:<logicalKey>`.

/// Logical keys used by the repositories and the action queue.
pub mod keys {
    pub const USERS: &str = "users";
    pub const JOBS: &str = "jobs";
    pub const SESSION: &str = "session";
    pub const QUEUE: &str = "queue";
    pub const DEAD_LETTERS: &str = "queue:dead";
    /// Sub-namespace evicted first when the quota is hit.
    pub const DRAFTS: &str = "drafts";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
    version: u32,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    /// `matchNG:v1:`
    pub fn namespace(&self) -> String {
        format!("{}:v{}:", self.prefix, self.version)
    }

    pub fn key(&self, logical: &str) -> String {
        format!("{}{}", self.namespace(), logical)
    }

    /// `matchNG:v1:drafts:`
    pub fn drafts_namespace(&self) -> String {
        format!("{}{}:", self.namespace(), keys::DRAFTS)
    }

    /// Logical key of draft `id`, e.g. `drafts:profile-form`.
    pub fn draft(&self, id: &str) -> String {
        format!("{}:{}", keys::DRAFTS, id)
    }

    /// Key belongs to this prefix, any version.
    pub fn owns_any_version(&self, raw: &str) -> bool {
        raw.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with(":v"))
    }

    pub fn is_draft(&self, raw: &str) -> bool {
        raw.starts_with(&self.drafts_namespace())
    }
}
