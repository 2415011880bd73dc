//! Boundary to the parameter-generation collaborator.
//!
//! The collaborator sees a [`FeatureSummary`] (features plus ranked lessons)
//! and answers with a [`GeneratedProfile`]. The profile is stored with the new
//! case untouched; nothing here interprets its fields.

use std::sync::Arc;

use printwise_geometry::{FeatureVector, GeometryAnalyzer, MeshModel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::case::{CaseId, ParameterSet};
use crate::error::CaseError;
use crate::library::CaseLibrary;
use crate::ranking::Lesson;

/// What the collaborator is given.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSummary {
    pub features: FeatureVector,
    pub material: String,
    pub lessons: Vec<Lesson>,
}

impl FeatureSummary {
    /// Field-name to value record for a language-neutral consumer.
    pub fn to_record(&self) -> Map<String, Value> {
        let lessons: Vec<Value> = self
            .lessons
            .iter()
            .map(|l| {
                json!({
                    "case_id": l.case.id.0,
                    "kind": l.kind,
                    "score": l.score,
                    "distance": l.distance,
                    "similarity": l.similarity,
                    "material": l.case.material,
                    "outcome": l.case.outcome,
                    "notes": l.case.notes,
                    "parameters": l.case.parameters,
                    "rationale": l.case.rationale,
                })
            })
            .collect();

        let mut record = Map::new();
        record.insert("features".into(), Value::Object(self.features.to_record()));
        record.insert("summary".into(), Value::String(self.features.summary()));
        record.insert("material".into(), Value::String(self.material.clone()));
        record.insert("lessons".into(), Value::Array(lessons));
        record
    }
}

/// Parameters plus the explanation for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProfile {
    pub parameters: ParameterSet,
    #[serde(default)]
    pub rationale: String,
}

/// Produces print parameters from a feature summary.
pub trait ParameterGenerator {
    fn generate(&self, summary: &FeatureSummary) -> Result<GeneratedProfile, CaseError>;
}

/// Result of one advice request.
#[derive(Debug, Clone)]
pub struct Advice {
    /// The case stored for this request; report the print result against it.
    pub case_id: CaseId,
    pub summary: FeatureSummary,
    pub profile: GeneratedProfile,
}

/// Runs analysis, retrieval, generation and recording in sequence.
pub struct Advisor<G> {
    analyzer: GeometryAnalyzer,
    library: Arc<CaseLibrary>,
    generator: G,
}

impl<G: ParameterGenerator> Advisor<G> {
    pub fn new(analyzer: GeometryAnalyzer, library: Arc<CaseLibrary>, generator: G) -> Self {
        Self {
            analyzer,
            library,
            generator,
        }
    }

    pub fn library(&self) -> &Arc<CaseLibrary> {
        &self.library
    }

    /// Build the collaborator's input for already-extracted features.
    pub fn summarize(&self, features: FeatureVector, material: &str) -> FeatureSummary {
        let lessons = self.library.retrieve_default(&features);
        FeatureSummary {
            features,
            material: material.to_string(),
            lessons,
        }
    }

    /// Analyze `mesh`, retrieve lessons, generate parameters and record the
    /// new case with outcome unset. A generator failure records nothing.
    #[instrument(skip(self, mesh), fields(faces = mesh.face_count()))]
    pub fn advise(&self, mesh: &MeshModel, material: &str) -> Result<Advice, CaseError> {
        let features = self.analyzer.analyze(mesh)?;
        let summary = self.summarize(features, material);
        let profile = self.generator.generate(&summary)?;
        let rationale = (!profile.rationale.is_empty()).then(|| profile.rationale.clone());
        let case_id = self.library.record_generated(
            summary.features.clone(),
            material,
            profile.parameters.clone(),
            rationale,
        )?;
        info!(%case_id, lessons = summary.lessons.len(), "advice generated");
        Ok(Advice {
            case_id,
            summary,
            profile,
        })
    }
}
