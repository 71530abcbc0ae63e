//! Seeker / employer profile.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{JobId, SkillId, UserId};
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Seeker,
    Employer,
    Admin,
}

/// A user profile as persisted under the `users` key.
///
/// `skills`, `saved_job_ids` and `applied_job_ids` have set semantics. They are
/// stored as `Vec`s so the persisted order stays stable, which means every
/// mutation must go through the methods below; pushing onto the fields
/// directly can introduce duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub skills: Vec<SkillId>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub primary_industry: Option<String>,
    #[serde(default)]
    pub primary_skill: Option<SkillId>,
    #[serde(default)]
    pub relocate_preference: bool,
    #[serde(default)]
    pub remote_preference: bool,
    #[serde(default)]
    pub saved_job_ids: Vec<JobId>,
    #[serde(default)]
    pub applied_job_ids: Vec<JobId>,
    /// Epoch milliseconds of the last `save_user`.
    #[serde(default)]
    pub updated_at: i64,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: String::new(),
            bio: None,
            role,
            skills: Vec::new(),
            location: Location::default(),
            primary_industry: None,
            primary_skill: None,
            relocate_preference: false,
            remote_preference: false,
            saved_job_ids: Vec::new(),
            applied_job_ids: Vec::new(),
            updated_at: 0,
        }
    }

    /// Add a skill. Returns `false` when it was already present.
    pub fn add_skill(&mut self, skill: SkillId) -> bool {
        insert_unique(&mut self.skills, skill)
    }

    /// Record an application. Returns `false` when already applied.
    pub fn apply_to(&mut self, job_id: JobId) -> bool {
        insert_unique(&mut self.applied_job_ids, job_id)
    }

    /// Flip the saved state of a job. Returns the new state (`true` = saved).
    pub fn toggle_saved(&mut self, job_id: JobId) -> bool {
        if let Some(pos) = self.saved_job_ids.iter().position(|j| *j == job_id) {
            self.saved_job_ids.remove(pos);
            false
        } else {
            self.saved_job_ids.push(job_id);
            true
        }
    }

    pub fn has_applied(&self, job_id: &JobId) -> bool {
        self.applied_job_ids.contains(job_id)
    }

    pub fn has_saved(&self, job_id: &JobId) -> bool {
        self.saved_job_ids.contains(job_id)
    }

    /// Union the set-valued fields of `other` into `self`.
    ///
    /// Entries already in `self` keep their position; entries only in `other`
    /// are appended in `other`'s order.
    pub fn merge_sets_from(&mut self, other: &UserProfile) {
        for skill in &other.skills {
            insert_unique(&mut self.skills, skill.clone());
        }
        for job in &other.saved_job_ids {
            insert_unique(&mut self.saved_job_ids, job.clone());
        }
        for job in &other.applied_job_ids {
            insert_unique(&mut self.applied_job_ids, job.clone());
        }
    }

    /// Remove duplicates that slipped in through direct field edits or
    /// hand-written import files. Keeps first occurrences.
    pub fn normalize_sets(&mut self) {
        dedup_in_place(&mut self.skills);
        dedup_in_place(&mut self.saved_job_ids);
        dedup_in_place(&mut self.applied_job_ids);
    }
}

impl Entity for UserProfile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn insert_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

fn dedup_in_place<T: PartialEq + Clone>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}
