//! Job postings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{EmployerId, JobId, SkillId};
use crate::location::Location;

/// Publication status of a job.
///
/// Any status may move to any other through [`Job::set_status`]; only `Open`
/// jobs are ever recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    Draft,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Draft => "DRAFT",
            JobStatus::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub employer_id: EmployerId,
    pub title: String,
    pub industry: String,
    /// Ordered as the employer listed them.
    #[serde(default)]
    pub required_skills: Vec<SkillId>,
    pub location: Location,
    #[serde(default)]
    pub is_remote: bool,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        id: JobId,
        employer_id: EmployerId,
        title: impl Into<String>,
        industry: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            id,
            employer_id,
            title: title.into(),
            industry: industry.into(),
            required_skills: Vec::new(),
            location,
            is_remote: false,
            status: JobStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SkillId>,
    {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn remote(mut self, is_remote: bool) -> Self {
        self.is_remote = is_remote;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }

    /// Change status. Returns `false` if the job already had that status.
    pub fn set_status(&mut self, status: JobStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }
}

impl Entity for Job {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_jobs_start_as_draft() {
        let job = Job::new(
            JobId::from("j1"),
            EmployerId::from("e1"),
            "Welder",
            "Manufacturing",
            Location::new("Lagos", "Ikeja"),
        );
        assert_eq!(job.status, JobStatus::Draft);
        assert!(!job.is_open());
    }

    #[test]
    fn status_transitions_report_changes() {
        let mut job = Job::new(
            JobId::from("j1"),
            EmployerId::from("e1"),
            "Welder",
            "Manufacturing",
            Location::new("Lagos", "Ikeja"),
        )
        .with_status(JobStatus::Open);

        assert!(job.set_status(JobStatus::Closed));
        assert!(!job.set_status(JobStatus::Closed));
        assert!(job.set_status(JobStatus::Draft));
        assert!(job.set_status(JobStatus::Open));
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Open).unwrap(), "\"OPEN\"");
        let s: JobStatus = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(s, JobStatus::Closed);
    }
}
