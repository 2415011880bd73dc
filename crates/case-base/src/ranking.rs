//! Turning neighbors into outcome-weighted lessons.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::case::{Case, Outcome};
use crate::config::{OutcomeWeights, RetrievalConfig, SimilarityKernel};
use crate::index::Neighbor;
use crate::repository::CaseRepository;

/// What a lesson tells the parameter generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    /// A similar model printed well (or acceptably): reuse its parameters.
    Precedent,
    /// A similar model failed: avoid repeating its parameters.
    Warning,
    /// No feedback yet; only the shape match is known.
    Unverified,
}

impl LessonKind {
    pub fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success | Outcome::Neutral => LessonKind::Precedent,
            Outcome::Failure => LessonKind::Warning,
            Outcome::Unset => LessonKind::Unverified,
        }
    }
}

/// A retrieved case with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    pub case: Case,
    pub distance: f64,
    /// Kernel similarity in (0, 1].
    pub similarity: f64,
    pub outcome_weight: f64,
    /// `similarity * outcome_weight`
    pub score: f64,
    pub kind: LessonKind,
}

/// Scores neighbors by `similarity(distance) * outcome_weight(outcome)`.
#[derive(Debug, Clone)]
pub struct RetrievalRanker {
    kernel: SimilarityKernel,
    outcome_weights: OutcomeWeights,
}

impl RetrievalRanker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            kernel: config.kernel,
            outcome_weights: config.outcome_weights,
        }
    }

    /// Lessons by descending score; equal scores put the newer case first,
    /// then the lower id. Neighbors missing from `repository` are skipped.
    pub fn rank(&self, neighbors: &[Neighbor], repository: &CaseRepository) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = neighbors
            .iter()
            .filter_map(|n| {
                let Some(case) = repository.get(n.id) else {
                    debug!(id = %n.id, "neighbor not in repository; skipped");
                    return None;
                };
                let similarity = self.kernel.similarity(n.distance);
                let outcome_weight = self.outcome_weights.weight(case.outcome);
                Some(Lesson {
                    case: case.clone(),
                    distance: n.distance,
                    similarity,
                    outcome_weight,
                    score: similarity * outcome_weight,
                    kind: LessonKind::for_outcome(case.outcome),
                })
            })
            .collect();
        lessons.sort_by(compare_lessons);
        lessons
    }
}

fn compare_lessons(a: &Lesson, b: &Lesson) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.case.created_at.cmp(&a.case.created_at))
        .then_with(|| a.case.id.cmp(&b.case.id))
}
