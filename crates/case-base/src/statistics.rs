use serde::{Deserialize, Serialize};

use crate::case::{Case, Outcome};

/// Outcome counts over a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_cases: usize,
    pub successful_cases: usize,
    pub failed_cases: usize,
    pub neutral_cases: usize,
    pub unknown_outcome: usize,
    /// Successes as a percentage of all cases.
    pub success_rate: f64,
}

impl Statistics {
    pub fn from_cases<'a>(cases: impl IntoIterator<Item = &'a Case>) -> Self {
        let mut stats = Statistics::default();
        for case in cases {
            stats.total_cases += 1;
            match case.outcome {
                Outcome::Success => stats.successful_cases += 1,
                Outcome::Failure => stats.failed_cases += 1,
                Outcome::Neutral => stats.neutral_cases += 1,
                Outcome::Unset => stats.unknown_outcome += 1,
            }
        }
        if stats.total_cases > 0 {
            stats.success_rate = stats.successful_cases as f64 / stats.total_cases as f64 * 100.0;
        }
        stats
    }
}
