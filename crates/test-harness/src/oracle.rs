//! Verification oracles — pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a scenario collect all failures in one pass.

use printwise_cases::{Lesson, Neighbor};
use printwise_geometry::{FeatureVector, MeshModel};

use crate::helpers::{count_mesh_edges, HarnessError};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }

    /// Turn a failed verdict into an error.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.passed {
            Ok(self)
        } else {
            Err(HarnessError::OracleFailure {
                oracle: self.oracle_name,
                detail: self.detail,
            })
        }
    }
}

/// Fail with the first failing verdict, if any.
pub fn require_all(verdicts: &[OracleVerdict]) -> Result<(), HarnessError> {
    match verdicts.iter().find(|v| !v.passed) {
        Some(v) => Err(HarnessError::OracleFailure {
            oracle: v.oracle_name.clone(),
            detail: v.detail.clone(),
        }),
        None => Ok(()),
    }
}

// ── Mesh Oracles ────────────────────────────────────────────────────────────

/// Every edge shared by exactly two faces.
pub fn check_watertight(mesh: &MeshModel) -> OracleVerdict {
    let (total, boundary) = count_mesh_edges(mesh);
    if boundary == 0 && mesh.is_watertight() {
        OracleVerdict::pass("watertight", format!("all {} edges are closed", total))
    } else {
        OracleVerdict::fail_val(
            "watertight",
            format!("{} of {} edges are boundary edges", boundary, total),
            boundary as f64,
        )
    }
}

// ── Feature Oracles ─────────────────────────────────────────────────────────

/// All stored invariants of the feature vector hold.
pub fn check_feature_invariants(features: &FeatureVector) -> OracleVerdict {
    match features.check_invariants() {
        Ok(()) => OracleVerdict::pass(
            "feature_invariants",
            format!("{} fields within range", features.named_fields().len()),
        ),
        Err(reason) => OracleVerdict::fail("feature_invariants", reason),
    }
}

/// The chosen orientation is no worse than printing as loaded.
pub fn check_orientation_improves(features: &FeatureVector) -> OracleVerdict {
    let upright = features.orientation.upright_overhang_ratio;
    let chosen = features.overhang_ratio;
    if chosen <= upright + 1e-12 {
        OracleVerdict::pass_val(
            "orientation_improves",
            format!(
                "overhang {:.4} -> {:.4} at {:.1}° tilt",
                upright,
                chosen,
                features.orientation.tilt_degrees()
            ),
            upright - chosen,
        )
    } else {
        OracleVerdict::fail_val(
            "orientation_improves",
            format!("chosen overhang {:.4} exceeds upright {:.4}", chosen, upright),
            upright - chosen,
        )
    }
}

/// A named feature is within `tolerance` of `expected`.
pub fn check_feature_close(
    features: &FeatureVector,
    field: &str,
    expected: f64,
    tolerance: f64,
) -> OracleVerdict {
    let name = format!("feature_{}", field);
    let Some(&(_, actual)) = features.named_fields().iter().find(|(n, _)| *n == field) else {
        return OracleVerdict::fail(&name, format!("no feature named {:?}", field));
    };
    let diff = (actual - expected).abs();
    if diff <= tolerance {
        OracleVerdict::pass_val(&name, format!("{} = {:.6} (expected {:.6})", field, actual, expected), actual)
    } else {
        OracleVerdict::fail_val(
            &name,
            format!(
                "{} = {:.6}, expected {:.6} ± {} (off by {:.6})",
                field, actual, expected, tolerance, diff
            ),
            actual,
        )
    }
}

// ── Retrieval Oracles ───────────────────────────────────────────────────────

/// Ascending distance, ties broken by ascending id.
pub fn check_neighbors_sorted(neighbors: &[Neighbor]) -> OracleVerdict {
    let bad = neighbors.windows(2).position(|w| {
        w[0].distance > w[1].distance || (w[0].distance == w[1].distance && w[0].id >= w[1].id)
    });
    match bad {
        None => OracleVerdict::pass(
            "neighbors_sorted",
            format!("{} neighbors in order", neighbors.len()),
        ),
        Some(i) => OracleVerdict::fail(
            "neighbors_sorted",
            format!(
                "{} ({}) precedes {} ({})",
                neighbors[i].id,
                neighbors[i].distance,
                neighbors[i + 1].id,
                neighbors[i + 1].distance
            ),
        ),
    }
}

/// Descending score, then newer first, then ascending id; scores in range.
pub fn check_ranking_order(lessons: &[Lesson]) -> OracleVerdict {
    if let Some(l) = lessons.iter().find(|l| !(l.score.is_finite() && l.score >= 0.0)) {
        return OracleVerdict::fail_val(
            "ranking_order",
            format!("{} has score {}", l.case.id, l.score),
            l.score,
        );
    }
    let bad = lessons.windows(2).position(|w| {
        let (a, b) = (&w[0], &w[1]);
        if a.score != b.score {
            return a.score < b.score;
        }
        if a.case.created_at != b.case.created_at {
            return a.case.created_at < b.case.created_at;
        }
        a.case.id >= b.case.id
    });
    match bad {
        None => OracleVerdict::pass("ranking_order", format!("{} lessons in order", lessons.len())),
        Some(i) => OracleVerdict::fail(
            "ranking_order",
            format!(
                "{} (score {:.6}) ranked above {} (score {:.6})",
                lessons[i].case.id,
                lessons[i].score,
                lessons[i + 1].case.id,
                lessons[i + 1].score
            ),
        ),
    }
}
