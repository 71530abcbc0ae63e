//! Pure seeker ↔ job scoring.
//!
//! No randomness, no hidden state: the same inputs always give the same
//! [`ScoreBreakdown`].

use serde::{Deserialize, Serialize};

use matchng_core::{Job, SkillId, UserProfile};

use crate::trends::trend_for;
use crate::weights::ScoreWeights;

pub const LOCATION_REMOTE: f64 = 1.0;
pub const LOCATION_SAME_CITY: f64 = 1.0;
pub const LOCATION_SAME_STATE_RELOCATE: f64 = 0.7;
pub const LOCATION_SAME_STATE: f64 = 0.4;
pub const LOCATION_OTHER_STATE_RELOCATE: f64 = 0.2;
pub const LOCATION_OTHER_STATE: f64 = 0.05;

/// The three sub-scores and the weighted final score, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub score_skill: f64,
    pub score_location: f64,
    pub score_trend: f64,
    /// Rounded to two decimals.
    pub score_final: f64,
}

/// Score one seeker against one job.
pub fn score(seeker: &UserProfile, job: &Job, weights: &ScoreWeights) -> ScoreBreakdown {
    let score_skill = skill_score(seeker, job);
    let score_location = location_score(seeker, job);
    let score_trend = trend_score(job);

    let weighted = weights.skill() * score_skill
        + weights.location() * score_location
        + weights.trend() * score_trend;

    ScoreBreakdown {
        score_skill,
        score_location,
        score_trend,
        score_final: round2(weighted).clamp(0.0, 1.0),
    }
}

/// Skill overlap.
///
/// A declared primary skill listed by the job is an immediate 1.0. Otherwise
/// cosine-style overlap: `|seeker ∩ required| / (sqrt(|seeker|) * sqrt(|required|))`.
pub fn skill_score(seeker: &UserProfile, job: &Job) -> f64 {
    if let Some(primary) = &seeker.primary_skill {
        if job.required_skills.contains(primary) {
            return 1.0;
        }
    }

    if seeker.skills.is_empty() || job.required_skills.is_empty() {
        return 0.0;
    }

    let mut counted: Vec<&SkillId> = Vec::with_capacity(job.required_skills.len());
    for skill in &job.required_skills {
        if seeker.skills.contains(skill) && !counted.contains(&skill) {
            counted.push(skill);
        }
    }

    let denom = (seeker.skills.len() as f64).sqrt() * (job.required_skills.len() as f64).sqrt();
    (counted.len() as f64 / denom).clamp(0.0, 1.0)
}

/// Proximity between the seeker and the job.
pub fn location_score(seeker: &UserProfile, job: &Job) -> f64 {
    if job.is_remote {
        return LOCATION_REMOTE;
    }

    let relocate = seeker.relocate_preference;
    if seeker.location.same_state(&job.location) {
        if seeker.location.same_city(&job.location) {
            LOCATION_SAME_CITY
        } else if relocate {
            LOCATION_SAME_STATE_RELOCATE
        } else {
            LOCATION_SAME_STATE
        }
    } else if relocate {
        LOCATION_OTHER_STATE_RELOCATE
    } else {
        LOCATION_OTHER_STATE
    }
}

pub fn trend_score(job: &Job) -> f64 {
    trend_for(&job.industry)
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchng_core::{EmployerId, JobId, JobStatus, Location, Role, UserId};
    use proptest::prelude::*;

    fn seeker(state: &str, city: &str) -> UserProfile {
        let mut p = UserProfile::new(UserId::from("seeker"), "Ada", Role::Seeker);
        p.location = Location::new(state, city);
        p
    }

    fn job(industry: &str, state: &str, city: &str, skills: &[&str]) -> Job {
        Job::new(
            JobId::from("job"),
            EmployerId::from("emp"),
            "Role",
            industry,
            Location::new(state, city),
        )
        .with_skills(skills.iter().copied())
        .with_status(JobStatus::Open)
    }

    #[test]
    fn primary_skill_fast_path_same_city_technology() {
        let mut s = seeker("Lagos", "Ikeja");
        s.primary_skill = Some(SkillId::from("Frontend Development"));
        let j = job("Technology", "Lagos", "ikeja", &["Frontend Development"]);

        let b = score(&s, &j, &ScoreWeights::DEFAULT);
        assert_eq!(b.score_skill, 1.0);
        assert_eq!(b.score_location, 1.0);
        assert_eq!(b.score_trend, 0.85);
        assert_eq!(b.score_final, 0.97);
    }

    #[test]
    fn remote_job_ignores_state_mismatch() {
        let s = seeker("Kano", "Kano");
        let j = job("Finance", "Lagos", "Ikeja", &[]).remote(true);
        assert_eq!(location_score(&s, &j), 1.0);
    }

    #[test]
    fn location_ladder() {
        let mut s = seeker("Lagos", "Ikeja");
        let same_state = job("Retail", "Lagos", "Lekki", &[]);
        let other_state = job("Retail", "Oyo", "Ibadan", &[]);

        assert_eq!(location_score(&s, &same_state), 0.4);
        assert_eq!(location_score(&s, &other_state), 0.05);

        s.relocate_preference = true;
        assert_eq!(location_score(&s, &same_state), 0.7);
        assert_eq!(location_score(&s, &other_state), 0.2);
    }

    #[test]
    fn cosine_overlap_without_primary_skill() {
        let mut s = seeker("Lagos", "Ikeja");
        for sk in ["Rust", "SQL", "Go", "Excel"] {
            s.add_skill(SkillId::from(sk));
        }
        let j = job("Technology", "Lagos", "Ikeja", &["Rust", "SQL"]);
        // 2 / (sqrt(4) * sqrt(2))
        let expected = 2.0 / (2.0 * 2f64.sqrt());
        assert!((skill_score(&s, &j) - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_skill_sets_score_zero() {
        let mut s = seeker("Lagos", "Ikeja");
        let j = job("Technology", "Lagos", "Ikeja", &["Rust"]);
        assert_eq!(skill_score(&s, &j), 0.0);

        s.add_skill(SkillId::from("Rust"));
        let no_reqs = job("Technology", "Lagos", "Ikeja", &[]);
        assert_eq!(skill_score(&s, &no_reqs), 0.0);
    }

    #[test]
    fn primary_skill_not_required_falls_through_to_overlap() {
        let mut s = seeker("Lagos", "Ikeja");
        s.primary_skill = Some(SkillId::from("Welding"));
        s.add_skill(SkillId::from("Rust"));
        let j = job("Technology", "Lagos", "Ikeja", &["Rust"]);
        assert_eq!(skill_score(&s, &j), 1.0);

        let j2 = job("Technology", "Lagos", "Ikeja", &["Go"]);
        assert_eq!(skill_score(&s, &j2), 0.0);
    }

    fn arb_seeker() -> impl Strategy<Value = UserProfile> {
        (
            proptest::collection::vec("[a-d]", 0..6),
            proptest::option::of("[a-d]"),
            "(Lagos|Oyo)",
            "(Ikeja|Ibadan)",
            any::<bool>(),
        )
            .prop_map(|(skills, primary, state, city, relocate)| {
                let mut p = seeker(&state, &city);
                for s in skills {
                    p.add_skill(SkillId::from(s));
                }
                p.primary_skill = primary.map(SkillId::from);
                p.relocate_preference = relocate;
                p
            })
    }

    fn arb_job() -> impl Strategy<Value = Job> {
        (
            proptest::collection::vec("[a-d]", 0..6),
            "(Technology|Retail|Unknown)",
            "(Lagos|Oyo)",
            "(Ikeja|Ibadan)",
            any::<bool>(),
        )
            .prop_map(|(skills, industry, state, city, remote)| {
                job(&industry, &state, &city, &[])
                    .with_skills(skills)
                    .remote(remote)
            })
    }

    proptest! {
        #[test]
        fn all_scores_stay_in_unit_range(s in arb_seeker(), j in arb_job()) {
            let b = score(&s, &j, &ScoreWeights::DEFAULT);
            for v in [b.score_skill, b.score_location, b.score_trend, b.score_final] {
                prop_assert!((0.0..=1.0).contains(&v), "{v} out of range");
            }
        }

        #[test]
        fn scoring_is_deterministic(s in arb_seeker(), j in arb_job()) {
            let a = score(&s, &j, &ScoreWeights::DEFAULT);
            let b = score(&s, &j, &ScoreWeights::DEFAULT);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn final_score_has_two_decimals(s in arb_seeker(), j in arb_job()) {
            let f = score(&s, &j, &ScoreWeights::DEFAULT).score_final;
            prop_assert!((f * 100.0 - (f * 100.0).round()).abs() < 1e-9);
        }
    }
}
