//! Recommendation ranking for seekers and candidate search for employers.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use matchng_core::{Job, UserProfile};

use crate::result::{CandidateResult, JobMatch, MatchResult};
use crate::scoring::{self, ScoreBreakdown};
use crate::weights::ScoreWeights;

pub const DEFAULT_MIN_SCORE: f64 = 0.25;
pub const DEFAULT_CROSS_INDUSTRY_SKILL: f64 = 0.8;

/// How jobs outside the seeker's primary industry are treated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossIndustryPolicy {
    /// Never admit out-of-industry jobs.
    Strict,
    /// Admit out-of-industry jobs whose skill score is at least the threshold.
    SkillThreshold(f64),
    /// Admit a random `pass_rate` share of out-of-industry jobs. The generator
    /// is re-seeded with `seed` on every call, so results are reproducible.
    Sampled { pass_rate: f64, seed: u64 },
}

impl Default for CrossIndustryPolicy {
    fn default() -> Self {
        Self::SkillThreshold(DEFAULT_CROSS_INDUSTRY_SKILL)
    }
}

/// Secondary ordering for results with equal final scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the caller's input order (stable sort).
    #[default]
    InputOrder,
    /// Most recently created job first, then input order.
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub weights: ScoreWeights,
    /// Results below this final score are dropped.
    pub min_score: f64,
    pub cross_industry: CrossIndustryPolicy,
    pub tie_break: TieBreak,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::DEFAULT,
            min_score: DEFAULT_MIN_SCORE,
            cross_industry: CrossIndustryPolicy::default(),
            tie_break: TieBreak::default(),
        }
    }
}

/// Stateless ranking over a caller-supplied job pool.
///
/// Every call recomputes from scratch; nothing is cached between calls.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Ranked recommendations for a seeker.
    ///
    /// Returns an empty list for profiles missing a primary industry, primary
    /// skill or city. Otherwise: open jobs only, industry filter, geography
    /// filter, score, threshold, sort by final score descending.
    pub fn get_recommendations(&self, seeker: &UserProfile, jobs: &[Job]) -> Vec<JobMatch> {
        let Some(industry) = matching_industry(seeker) else {
            debug!(user_id = %seeker.id, "profile incomplete for matching; skipping");
            return Vec::new();
        };

        let mut rng = match self.config.cross_industry {
            CrossIndustryPolicy::Sampled { seed, .. } => Some(StdRng::seed_from_u64(seed)),
            _ => None,
        };

        let mut pruned = 0usize;
        let mut results: Vec<JobMatch> = Vec::new();
        for job in jobs {
            if !job.is_open() {
                pruned += 1;
                continue;
            }
            if !job.industry.trim().eq_ignore_ascii_case(industry)
                && !self.admit_cross_industry(seeker, job, rng.as_mut())
            {
                pruned += 1;
                continue;
            }
            if !job.is_remote
                && !seeker.location.same_state(&job.location)
                && !seeker.relocate_preference
            {
                pruned += 1;
                continue;
            }

            let scores = scoring::score(seeker, job, &self.config.weights);
            if scores.score_final < self.config.min_score {
                pruned += 1;
                continue;
            }
            results.push(MatchResult::new(job.clone(), scores));
        }

        match self.config.tie_break {
            TieBreak::InputOrder => results.sort_by(|a, b| by_score_desc(&a.scores, &b.scores)),
            TieBreak::Newest => results.sort_by(|a, b| {
                by_score_desc(&a.scores, &b.scores)
                    .then_with(|| b.entity.created_at.cmp(&a.entity.created_at))
            }),
        }

        debug!(
            user_id = %seeker.id,
            considered = jobs.len(),
            pruned,
            returned = results.len(),
            "computed recommendations"
        );
        results
    }

    /// Score a single seeker/job pair with no filtering.
    pub fn compute_match(&self, seeker: &UserProfile, job: &Job) -> JobMatch {
        MatchResult::new(
            job.clone(),
            scoring::score(seeker, job, &self.config.weights),
        )
    }

    /// Employer-side variant of [`compute_match`](Self::compute_match).
    pub fn compute_candidate_match(&self, job: &Job, seeker: &UserProfile) -> CandidateResult {
        MatchResult::new(
            seeker.clone(),
            scoring::score(seeker, job, &self.config.weights),
        )
    }

    /// Candidate search: every seeker scored against `job`, thresholded and
    /// sorted by final score descending (ties keep input order).
    pub fn rank_candidates(&self, job: &Job, seekers: &[UserProfile]) -> Vec<CandidateResult> {
        let mut results: Vec<CandidateResult> = seekers
            .iter()
            .map(|s| self.compute_candidate_match(job, s))
            .filter(|r| r.score_final() >= self.config.min_score)
            .collect();
        results.sort_by(|a, b| by_score_desc(&a.scores, &b.scores));
        results
    }

    fn admit_cross_industry(
        &self,
        seeker: &UserProfile,
        job: &Job,
        rng: Option<&mut StdRng>,
    ) -> bool {
        match self.config.cross_industry {
            CrossIndustryPolicy::Strict => false,
            CrossIndustryPolicy::SkillThreshold(threshold) => {
                scoring::skill_score(seeker, job) >= threshold
            }
            CrossIndustryPolicy::Sampled { pass_rate, .. } => match rng {
                Some(rng) => rng.gen_range(0.0..1.0) > 1.0 - pass_rate,
                None => false,
            },
        }
    }
}

fn matching_industry(seeker: &UserProfile) -> Option<&str> {
    let industry = seeker.primary_industry.as_deref()?.trim();
    if industry.is_empty() || seeker.primary_skill.is_none() || !seeker.location.has_city() {
        return None;
    }
    Some(industry)
}

fn by_score_desc(a: &ScoreBreakdown, b: &ScoreBreakdown) -> Ordering {
    b.score_final.total_cmp(&a.score_final)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use matchng_core::{EmployerId, JobId, JobStatus, Location, Role, SkillId, UserId};

    fn seeker() -> UserProfile {
        let mut p = UserProfile::new(UserId::from("u1"), "Ada", Role::Seeker);
        p.location = Location::new("Lagos", "Ikeja");
        p.primary_industry = Some("Technology".to_string());
        p.primary_skill = Some(SkillId::from("Frontend Development"));
        p.add_skill(SkillId::from("Frontend Development"));
        p.add_skill(SkillId::from("UI Design"));
        p
    }

    fn job(id: &str, industry: &str, state: &str, city: &str, skills: &[&str]) -> Job {
        Job::new(
            JobId::from(id),
            EmployerId::from("emp"),
            "Role",
            industry,
            Location::new(state, city),
        )
        .with_skills(skills.iter().copied())
        .with_status(JobStatus::Open)
    }

    fn ids(results: &[JobMatch]) -> Vec<&str> {
        results.iter().map(|r| r.entity.id.as_str()).collect()
    }

    #[test]
    fn incomplete_profiles_get_nothing() {
        let engine = RankingEngine::default();
        let jobs = vec![job("j1", "Technology", "Lagos", "Ikeja", &["Frontend Development"])];

        let mut no_industry = seeker();
        no_industry.primary_industry = None;
        assert!(engine.get_recommendations(&no_industry, &jobs).is_empty());

        let mut no_skill = seeker();
        no_skill.primary_skill = None;
        assert!(engine.get_recommendations(&no_skill, &jobs).is_empty());

        let mut no_city = seeker();
        no_city.location.city = String::new();
        assert!(engine.get_recommendations(&no_city, &jobs).is_empty());
    }

    #[test]
    fn only_open_jobs_are_ranked() {
        let engine = RankingEngine::default();
        let jobs = vec![
            job("draft", "Technology", "Lagos", "Ikeja", &["Frontend Development"])
                .with_status(JobStatus::Draft),
            job("closed", "Technology", "Lagos", "Ikeja", &["Frontend Development"])
                .with_status(JobStatus::Closed),
            job("open", "Technology", "Lagos", "Ikeja", &["Frontend Development"]),
        ];
        assert_eq!(ids(&engine.get_recommendations(&seeker(), &jobs)), vec!["open"]);
    }

    #[test]
    fn geography_filter_requires_relocation_for_other_states() {
        let engine = RankingEngine::default();
        let jobs = vec![
            job("abuja", "Technology", "FCT", "Abuja", &["Frontend Development"]),
            job("remote", "Technology", "FCT", "Abuja", &["Frontend Development"]).remote(true),
        ];

        let s = seeker();
        assert_eq!(ids(&engine.get_recommendations(&s, &jobs)), vec!["remote"]);

        let mut mover = seeker();
        mover.relocate_preference = true;
        assert_eq!(
            ids(&engine.get_recommendations(&mover, &jobs)),
            vec!["remote", "abuja"]
        );
    }

    #[test]
    fn results_below_threshold_are_dropped() {
        let engine = RankingEngine::default();
        // No skill overlap, other city, unknown trend: 0.3*0.4 + 0.2*0.4 = 0.2
        let mut s = seeker();
        s.primary_industry = Some("Basket Weaving".to_string());
        let jobs = vec![job("weak", "Basket Weaving", "Lagos", "Lekki", &["Weaving"])];
        assert!(engine.get_recommendations(&s, &jobs).is_empty());
    }

    #[test]
    fn sorted_descending_with_stable_ties() {
        let engine = RankingEngine::default();
        let jobs = vec![
            job("tie-a", "Technology", "Lagos", "Lekki", &["Frontend Development"]),
            job("best", "Technology", "Lagos", "Ikeja", &["Frontend Development"]),
            job("tie-b", "Technology", "Lagos", "Lekki", &["Frontend Development"]),
        ];
        let results = engine.get_recommendations(&seeker(), &jobs);
        assert_eq!(ids(&results), vec!["best", "tie-a", "tie-b"]);
        assert_eq!(results[0].score_final(), 0.97);
    }

    #[test]
    fn newest_tie_break_prefers_recent_jobs() {
        let engine = RankingEngine::new(RankingConfig {
            tie_break: TieBreak::Newest,
            ..RankingConfig::default()
        });
        let mut older = job("older", "Technology", "Lagos", "Lekki", &["Frontend Development"]);
        older.created_at = Utc::now() - Duration::days(3);
        let newer = job("newer", "Technology", "Lagos", "Lekki", &["Frontend Development"]);

        let results = engine.get_recommendations(&seeker(), &[older, newer]);
        assert_eq!(ids(&results), vec!["newer", "older"]);
    }

    #[test]
    fn skill_threshold_admits_strong_cross_industry_matches_only() {
        let engine = RankingEngine::default();
        let jobs = vec![
            job("fin-strong", "Finance", "Lagos", "Ikeja", &["Frontend Development"]),
            job("fin-weak", "Finance", "Lagos", "Ikeja", &["Accounting"]),
        ];
        assert_eq!(ids(&engine.get_recommendations(&seeker(), &jobs)), vec!["fin-strong"]);

        let strict = RankingEngine::new(RankingConfig {
            cross_industry: CrossIndustryPolicy::Strict,
            ..RankingConfig::default()
        });
        assert!(strict.get_recommendations(&seeker(), &jobs).is_empty());
    }

    #[test]
    fn sampled_policy_is_reproducible_for_a_seed() {
        let engine = RankingEngine::new(RankingConfig {
            cross_industry: CrossIndustryPolicy::Sampled {
                pass_rate: 0.1,
                seed: 7,
            },
            ..RankingConfig::default()
        });
        let jobs: Vec<Job> = (0..200)
            .map(|i| {
                job(
                    &format!("fin-{i}"),
                    "Finance",
                    "Lagos",
                    "Ikeja",
                    &["Frontend Development"],
                )
            })
            .collect();

        let first = engine.get_recommendations(&seeker(), &jobs);
        let second = engine.get_recommendations(&seeker(), &jobs);
        assert_eq!(ids(&first), ids(&second));
        // Roughly 10% of 200 pass; allow wide slack.
        assert!(first.len() > 2 && first.len() < 50, "admitted {}", first.len());
    }

    #[test]
    fn sampled_policy_leaves_in_industry_jobs_alone() {
        let engine = RankingEngine::new(RankingConfig {
            cross_industry: CrossIndustryPolicy::Sampled {
                pass_rate: 0.0,
                seed: 1,
            },
            ..RankingConfig::default()
        });
        let jobs = vec![
            job("tech", "Technology", "Lagos", "Ikeja", &["Frontend Development"]),
            job("fin", "Finance", "Lagos", "Ikeja", &["Frontend Development"]),
        ];
        assert_eq!(ids(&engine.get_recommendations(&seeker(), &jobs)), vec!["tech"]);
    }

    #[test]
    fn single_pair_variants_do_not_filter() {
        let engine = RankingEngine::default();
        let closed = job("closed", "Retail", "Oyo", "Ibadan", &[]).with_status(JobStatus::Closed);

        let m = engine.compute_match(&seeker(), &closed);
        assert_eq!(m.entity.id.as_str(), "closed");
        assert_eq!(m.scores.score_location, 0.05);

        let c = engine.compute_candidate_match(&closed, &seeker());
        assert_eq!(c.entity.id.as_str(), "u1");
        assert_eq!(c.scores, m.scores);
    }

    #[test]
    fn candidate_search_ranks_seekers() {
        let engine = RankingEngine::default();
        let target = job("j", "Technology", "Lagos", "Ikeja", &["Frontend Development"]);

        let strong = seeker();
        let mut weak = seeker();
        weak.id = UserId::from("u2");
        weak.primary_skill = None;
        weak.skills.clear();
        weak.location = Location::new("Kano", "Kano");

        let ranked = engine.rank_candidates(&target, &[weak, strong]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].entity.id.as_str(), "u1");
    }
}
