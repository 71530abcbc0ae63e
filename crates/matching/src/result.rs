use serde::{Deserialize, Serialize};

use matchng_core::{Job, UserProfile};

use crate::scoring::ScoreBreakdown;

/// A scored entity. Derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult<E> {
    pub entity: E,
    #[serde(flatten)]
    pub scores: ScoreBreakdown,
}

/// Seeker-side result: a job scored for a seeker.
pub type JobMatch = MatchResult<Job>;

/// Employer-side result: a seeker scored for a job.
pub type CandidateResult = MatchResult<UserProfile>;

impl<E> MatchResult<E> {
    pub fn new(entity: E, scores: ScoreBreakdown) -> Self {
        Self { entity, scores }
    }

    pub fn score_final(&self) -> f64 {
        self.scores.score_final
    }
}
