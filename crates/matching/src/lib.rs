//! `matchng-matching` — scoring and ranking of seekers against jobs.
//!
//! - [`scoring`]: pure three-factor score (skill, location, industry trend).
//! - [`ranking`]: filtering, thresholding and ordering over a job pool, plus
//!   the employer-side candidate search.

pub mod ranking;
pub mod result;
pub mod scoring;
pub mod trends;
pub mod weights;

pub use ranking::{CrossIndustryPolicy, RankingConfig, RankingEngine, TieBreak};
pub use result::{CandidateResult, JobMatch, MatchResult};
pub use scoring::{ScoreBreakdown, score};
pub use weights::ScoreWeights;
