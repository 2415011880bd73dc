//! Exact weighted nearest-neighbor search over feature vectors.
//!
//! Fields are rescaled with statistics taken over every indexed vector, so a
//! volume in mm³ does not drown out a unitless ratio. The index is derived
//! state: it can always be rebuilt from the repository.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use printwise_geometry::{FeatureVector, FEATURE_COUNT};

use crate::case::CaseId;
use crate::config::{Normalization, RetrievalConfig};
use crate::repository::CaseRepository;

type Encoded = [f64; FEATURE_COUNT];

/// One query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: CaseId,
    pub distance: f64,
}

/// Spreads below this fraction of a field's magnitude count as no spread.
const RELATIVE_SPREAD_FLOOR: f64 = 1e-6;

/// Per-field affine rescaling `(x - offset) / scale`.
#[derive(Debug, Clone, PartialEq)]
struct Scaler {
    offset: Encoded,
    /// Always positive. A field with no usable spread is scaled by its
    /// magnitude (at least 1) so query differences still register.
    scale: Encoded,
}

/// Spread if it is usable, otherwise the field's magnitude.
fn effective_scale(spread: f64, magnitude: f64) -> f64 {
    let unit = magnitude.max(1.0);
    if spread.is_finite() && spread > RELATIVE_SPREAD_FLOOR * unit {
        spread
    } else {
        unit
    }
}

impl Scaler {
    fn identity() -> Self {
        Self {
            offset: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
        }
    }

    fn fit<'a>(mode: Normalization, vectors: impl Iterator<Item = &'a Encoded> + Clone) -> Self {
        let mut scaler = Self::identity();
        let n = vectors.clone().count();
        if n == 0 {
            return scaler;
        }
        for i in 0..FEATURE_COUNT {
            let magnitude = vectors.clone().map(|v| v[i].abs()).fold(0.0, f64::max);
            let (offset, spread) = match mode {
                Normalization::MinMax => {
                    let (lo, hi) = vectors
                        .clone()
                        .map(|v| v[i])
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
                    (lo, hi - lo)
                }
                Normalization::ZScore => {
                    let mean = vectors.clone().map(|v| v[i]).sum::<f64>() / n as f64;
                    let var = vectors.clone().map(|v| (v[i] - mean).powi(2)).sum::<f64>() / n as f64;
                    (mean, var.sqrt())
                }
            };
            scaler.offset[i] = offset;
            scaler.scale[i] = effective_scale(spread, magnitude);
        }
        scaler
    }

    fn apply(&self, v: &Encoded) -> Encoded {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            if self.scale[i].is_finite() {
                out[i] = (v[i] - self.offset[i]) / self.scale[i];
            }
        }
        out
    }
}

/// Weighted Euclidean k-nearest-neighbor index by linear scan.
///
/// Results are exact: ascending distance, equal distances by lower case id.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    normalization: Normalization,
    weights: Encoded,
    raw: BTreeMap<CaseId, Encoded>,
    scaler: Scaler,
    /// Normalized copies of `raw`, refreshed whenever the scaler changes.
    normalized: BTreeMap<CaseId, Encoded>,
}

impl SimilarityIndex {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            normalization: config.normalization,
            weights: config.weight_vector(),
            raw: BTreeMap::new(),
            scaler: Scaler::identity(),
            normalized: BTreeMap::new(),
        }
    }

    /// Index every case in the repository.
    pub fn build(config: &RetrievalConfig, repository: &CaseRepository) -> Self {
        let mut index = Self::new(config);
        for case in repository.iter() {
            index.raw.insert(case.id, case.features.encode());
        }
        index.refit();
        index
    }

    /// Add or replace the vector stored for `id`.
    pub fn insert(&mut self, id: CaseId, vector: &FeatureVector) {
        self.raw.insert(id, vector.encode());
        self.refit();
    }

    pub fn remove(&mut self, id: CaseId) -> bool {
        let removed = self.raw.remove(&id).is_some();
        if removed {
            self.refit();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn contains(&self, id: CaseId) -> bool {
        self.raw.contains_key(&id)
    }

    fn refit(&mut self) {
        self.scaler = Scaler::fit(self.normalization, self.raw.values());
        self.normalized = self
            .raw
            .iter()
            .map(|(&id, v)| (id, self.scaler.apply(v)))
            .collect();
    }

    /// Weighted distance between two raw vectors under the current scaling.
    pub fn distance(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        self.weighted(&self.scaler.apply(&a.encode()), &self.scaler.apply(&b.encode()))
    }

    fn weighted(&self, a: &Encoded, b: &Encoded) -> f64 {
        let mut sum = 0.0;
        for i in 0..FEATURE_COUNT {
            let d = a[i] - b[i];
            sum += self.weights[i] * d * d;
        }
        sum.sqrt()
    }

    /// The `k` nearest indexed cases to `vector`.
    pub fn query(&self, vector: &FeatureVector, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let probe = self.scaler.apply(&vector.encode());
        let mut all: Vec<Neighbor> = self
            .normalized
            .iter()
            .map(|(&id, v)| Neighbor {
                id,
                distance: self.weighted(&probe, v),
            })
            .collect();
        all.sort_by(compare_neighbors);
        all.truncate(k);
        all
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}
