use serde::{Deserialize, Serialize};

use matchng_core::{DomainError, DomainResult};

const SUM_TOLERANCE: f64 = 1e-9;

/// Relative weight of each sub-score in the final score.
///
/// Always sums to 1.0. The check happens once in [`ScoreWeights::new`];
/// scoring code trusts the value it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    skill: f64,
    location: f64,
    trend: f64,
}

impl ScoreWeights {
    pub const DEFAULT: ScoreWeights = ScoreWeights {
        skill: 0.5,
        location: 0.3,
        trend: 0.2,
    };

    pub fn new(skill: f64, location: f64, trend: f64) -> DomainResult<Self> {
        if [skill, location, trend].iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::validation(
                "score weights must be finite and non-negative",
            ));
        }
        let sum = skill + location + trend;
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(DomainError::validation(format!(
                "score weights must sum to 1.0 (got {sum})"
            )));
        }
        Ok(Self {
            skill,
            location,
            trend,
        })
    }

    pub fn skill(&self) -> f64 {
        self.skill
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    pub fn sum(&self) -> f64 {
        self.skill + self.location + self.trend
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}
