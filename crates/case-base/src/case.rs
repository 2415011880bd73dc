//! Case records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use printwise_geometry::FeatureVector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CaseError;

/// Parameters produced by the generation collaborator. Opaque to this crate.
pub type ParameterSet = Map<String, Value>;

/// Stable case identifier, assigned from 1 upward and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub u64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case-{}", self.0)
    }
}

/// Recorded print result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No feedback yet.
    #[default]
    Unset,
    Success,
    Failure,
    Neutral,
}

const POSITIVE_KEYWORDS: [&str; 7] = ["good", "great", "excellent", "perfect", "success", "worked", "nice"];
const NEGATIVE_KEYWORDS: [&str; 7] = ["bad", "failed", "poor", "issue", "problem", "error", "terrible"];

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Unset => "unset",
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Neutral => "neutral",
        }
    }

    pub fn is_set(self) -> bool {
        self != Outcome::Unset
    }

    /// Classify free-text feedback by counting positive and negative keywords.
    pub fn infer_from_feedback(text: &str) -> Outcome {
        let lower = text.to_lowercase();
        let positive = POSITIVE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
        let negative = NEGATIVE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Outcome::Success,
            std::cmp::Ordering::Less => Outcome::Failure,
            std::cmp::Ordering::Equal => Outcome::Neutral,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unset" => Ok(Outcome::Unset),
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            "neutral" => Ok(Outcome::Neutral),
            _ => Err(CaseError::InvalidOutcome { value: s.to_string() }),
        }
    }
}

/// One historical analysis with its parameters and (eventually) its outcome.
///
/// `features` and `material` never change after the case is appended; only
/// the outcome fields are filled in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub features: FeatureVector,
    pub material: String,
    #[serde(default)]
    pub parameters: ParameterSet,
    /// Explanation returned with the parameters, if any.
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub outcome_recorded_at: Option<DateTime<Utc>>,
}

impl Case {
    /// Check the fields a snapshot import must be able to trust.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.0 == 0 {
            return Err("case id 0 is reserved".into());
        }
        if self.material.trim().is_empty() {
            return Err("material label is empty".into());
        }
        self.features.check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse() {
        assert_eq!("success".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!(" Failure ".parse::<Outcome>().unwrap(), Outcome::Failure);
        let err = "great".parse::<Outcome>().unwrap_err();
        assert_eq!(
            err,
            CaseError::InvalidOutcome {
                value: "great".into()
            }
        );
    }

    #[test]
    fn test_outcome_serde_names() {
        assert_eq!(serde_json::to_string(&Outcome::Neutral).unwrap(), "\"neutral\"");
        let back: Outcome = serde_json::from_str("\"unset\"").unwrap();
        assert_eq!(back, Outcome::Unset);
    }

    #[test]
    fn test_infer_from_feedback() {
        assert_eq!(Outcome::infer_from_feedback("Worked great, perfect layers"), Outcome::Success);
        assert_eq!(Outcome::infer_from_feedback("Print FAILED, bad adhesion"), Outcome::Failure);
        assert_eq!(Outcome::infer_from_feedback("good but one issue"), Outcome::Neutral);
        assert_eq!(Outcome::infer_from_feedback(""), Outcome::Neutral);
    }

    #[test]
    fn test_case_id_display() {
        assert_eq!(CaseId(7).to_string(), "case-7");
        assert!(CaseId(2) < CaseId(10));
    }
}
