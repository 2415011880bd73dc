//! Retrieval configuration: field weights, normalization, similarity kernel
//! and outcome weighting.

use std::collections::BTreeMap;

use printwise_geometry::{FeatureField, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::case::Outcome;
use crate::error::CaseError;

/// How each feature field is rescaled before distances are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `(x - min) / (max - min)` over the indexed cases.
    #[default]
    MinMax,
    /// `(x - mean) / std` over the indexed cases.
    ZScore,
}

/// Maps a distance to a similarity in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimilarityKernel {
    /// `exp(-distance / scale)`
    Exponential { scale: f64 },
    /// `1 / (1 + distance)`
    Inverse,
}

impl Default for SimilarityKernel {
    fn default() -> Self {
        SimilarityKernel::Exponential { scale: 1.0 }
    }
}

impl SimilarityKernel {
    /// Never returns 0: a far neighbor keeps a tiny positive similarity so
    /// outcome weighting still orders it.
    pub fn similarity(&self, distance: f64) -> f64 {
        let d = distance.max(0.0);
        let s = match *self {
            SimilarityKernel::Exponential { scale } => (-d / scale).exp(),
            SimilarityKernel::Inverse => 1.0 / (1.0 + d),
        };
        s.max(f64::MIN_POSITIVE)
    }
}

/// Score multiplier per recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeWeights {
    pub success: f64,
    pub neutral: f64,
    pub failure: f64,
    pub unset: f64,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        Self {
            success: 1.0,
            neutral: 0.6,
            failure: 0.2,
            unset: 0.5,
        }
    }
}

impl OutcomeWeights {
    pub fn weight(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Success => self.success,
            Outcome::Neutral => self.neutral,
            Outcome::Failure => self.failure,
            Outcome::Unset => self.unset,
        }
    }
}

/// Configuration for similarity search and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Per-field distance weights; fields not listed weigh 1.
    pub weights: BTreeMap<FeatureField, f64>,
    pub normalization: Normalization,
    pub kernel: SimilarityKernel,
    pub outcome_weights: OutcomeWeights,
    /// Neighbors retrieved when the caller does not say.
    pub default_neighbors: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weights: FeatureField::ALL.iter().map(|&f| (f, 1.0)).collect(),
            normalization: Normalization::MinMax,
            kernel: SimilarityKernel::default(),
            outcome_weights: OutcomeWeights::default(),
            default_neighbors: 5,
        }
    }
}

impl RetrievalConfig {
    /// Compare shape only: size, volume and face counts carry no weight.
    pub fn shape_only() -> Self {
        let mut config = Self::default();
        for field in [
            FeatureField::Width,
            FeatureField::Depth,
            FeatureField::Height,
            FeatureField::Volume,
            FeatureField::FaceCount,
            FeatureField::FaceDensity,
        ] {
            config.weights.insert(field, 0.0);
        }
        config
    }

    pub fn with_weight(mut self, field: FeatureField, weight: f64) -> Self {
        self.weights.insert(field, weight);
        self
    }

    pub fn weight(&self, field: FeatureField) -> f64 {
        self.weights.get(&field).copied().unwrap_or(1.0)
    }

    /// Weights in encoding order.
    pub fn weight_vector(&self) -> [f64; FEATURE_COUNT] {
        FeatureField::ALL.map(|field| self.weight(field))
    }

    pub fn validate(&self) -> Result<(), CaseError> {
        let fail = |reason: String| Err(CaseError::InvalidConfig { reason });

        for (field, &w) in &self.weights {
            if !(w.is_finite() && w >= 0.0) {
                return fail(format!("weight for {field} must be non-negative, got {w}"));
            }
        }
        if self.weight_vector().iter().all(|&w| w == 0.0) {
            return fail("at least one field weight must be positive".into());
        }
        if let SimilarityKernel::Exponential { scale } = self.kernel {
            if !(scale.is_finite() && scale > 0.0) {
                return fail(format!("exponential kernel scale must be positive, got {scale}"));
            }
        }
        let ow = &self.outcome_weights;
        for (name, w) in [
            ("success", ow.success),
            ("neutral", ow.neutral),
            ("failure", ow.failure),
            ("unset", ow.unset),
        ] {
            if !(w.is_finite() && w >= 0.0) {
                return fail(format!("outcome weight {name} must be non-negative, got {w}"));
            }
        }
        if ow.unset >= ow.success {
            return fail(format!(
                "unset outcome weight {} must be below the success weight {}",
                ow.unset, ow.success
            ));
        }
        if self.default_neighbors == 0 {
            return fail("default neighbor count must be at least 1".into());
        }
        Ok(())
    }
}
