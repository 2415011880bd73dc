//! Scenario — fluent API for scripting analyze/record/feedback/retrieve runs.
//!
//! Drives the real analyzer and case library. Models and their cases are
//! addressed by readable names instead of ids.

use std::collections::HashMap;
use std::sync::Arc;

use printwise_cases::{CaseId, CaseLibrary, Lesson, Outcome, RetrievalConfig};
use printwise_geometry::{
    from_bytes, AnalysisConfig, FeatureVector, GeometryAnalyzer, MeshFormat, MeshModel,
};

use crate::helpers::*;
use crate::oracle::{self, OracleVerdict};
use crate::report::AnalysisReport;
use crate::stl;

struct NamedModel {
    mesh: MeshModel,
    features: FeatureVector,
    case: Option<CaseId>,
}

/// A fluent builder for analyzing fixtures and exercising the case library.
pub struct Scenario {
    analyzer: GeometryAnalyzer,
    library: Arc<CaseLibrary>,
    models: HashMap<String, NamedModel>,
    history: Vec<(String, String)>,
}

impl Scenario {
    /// Quick analysis preset, default retrieval settings.
    pub fn quick() -> Result<Self, HarnessError> {
        Self::with_config(AnalysisConfig::quick(), RetrievalConfig::default())
    }

    pub fn with_config(
        analysis: AnalysisConfig,
        retrieval: RetrievalConfig,
    ) -> Result<Self, HarnessError> {
        Ok(Self {
            analyzer: GeometryAnalyzer::new(analysis)?,
            library: Arc::new(CaseLibrary::new(retrieval)?),
            models: HashMap::new(),
            history: Vec::new(),
        })
    }

    // ── Analysis ────────────────────────────────────────────────────────

    /// Analyze a mesh and remember it under `name`.
    pub fn analyze(&mut self, name: &str, mesh: MeshModel) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let features = self.analyzer.analyze(&mesh)?;
        self.history.push((name.to_string(), "analyze".to_string()));
        self.models.insert(
            name.to_string(),
            NamedModel {
                mesh,
                features,
                case: None,
            },
        );
        Ok(self)
    }

    /// Write the mesh as binary STL, read it back and analyze the result.
    pub fn analyze_via_stl(&mut self, name: &str, mesh: &MeshModel) -> Result<&mut Self, HarnessError> {
        let bytes = stl::export_binary_stl(mesh, name)?;
        let reloaded = from_bytes(&bytes, MeshFormat::Stl)?;
        self.analyze(name, reloaded)
    }

    // ── Case Library ────────────────────────────────────────────────────

    /// Store the named model's features as a new case.
    pub fn record(&mut self, name: &str, material: &str) -> Result<CaseId, HarnessError> {
        let features = self.model(name)?.features.clone();
        let id = self.library.record_analysis(features, material)?;
        if let Some(model) = self.models.get_mut(name) {
            model.case = Some(id);
        }
        self.history.push((name.to_string(), format!("record {}", id)));
        Ok(id)
    }

    /// Report how the named model's print turned out.
    pub fn outcome(
        &mut self,
        name: &str,
        outcome: Outcome,
        notes: Option<&str>,
    ) -> Result<&mut Self, HarnessError> {
        let id = self.case_id(name)?;
        self.library.record_outcome(id, outcome, notes)?;
        self.history
            .push((name.to_string(), format!("outcome {}", outcome.as_str())));
        Ok(self)
    }

    /// Lessons for the named model's features.
    pub fn retrieve(&self, name: &str, k: usize) -> Result<Vec<Lesson>, HarnessError> {
        Ok(self.library.retrieve(&self.model(name)?.features, k))
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn features(&self, name: &str) -> Result<&FeatureVector, HarnessError> {
        Ok(&self.model(name)?.features)
    }

    pub fn mesh(&self, name: &str) -> Result<&MeshModel, HarnessError> {
        Ok(&self.model(name)?.mesh)
    }

    pub fn case_id(&self, name: &str) -> Result<CaseId, HarnessError> {
        self.model(name)?
            .case
            .ok_or_else(|| HarnessError::UnknownModel(format!("{} (not recorded)", name)))
    }

    pub fn library(&self) -> &Arc<CaseLibrary> {
        &self.library
    }

    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── Verification ────────────────────────────────────────────────────

    /// Run the mesh and feature oracles for the named model.
    pub fn check_model(&self, name: &str) -> Result<Vec<OracleVerdict>, HarnessError> {
        let model = self.model(name)?;
        Ok(vec![
            oracle::check_feature_invariants(&model.features),
            oracle::check_orientation_improves(&model.features),
            oracle::check_watertight(&model.mesh),
        ])
    }

    /// Run the retrieval oracles for a query with the named model.
    pub fn check_retrieval(&self, name: &str, k: usize) -> Result<Vec<OracleVerdict>, HarnessError> {
        let features = &self.model(name)?.features;
        let neighbors = self.library.query(features, k);
        let lessons = self.library.retrieve(features, k);
        Ok(vec![
            oracle::check_neighbors_sorted(&neighbors),
            oracle::check_ranking_order(&lessons),
        ])
    }

    pub fn report(&self, name: &str, k: usize) -> Result<AnalysisReport, HarnessError> {
        let model = self.model(name)?;
        let mut report = AnalysisReport::from_features(name, &model.features);
        report.lessons = self
            .library
            .retrieve(&model.features, k)
            .iter()
            .map(Into::into)
            .collect();
        let mut verdicts = self.check_model(name)?;
        verdicts.extend(self.check_retrieval(name, k)?);
        Ok(report.with_verdicts(verdicts))
    }

    // ── Private Helpers ─────────────────────────────────────────────────

    fn model(&self, name: &str) -> Result<&NamedModel, HarnessError> {
        self.models
            .get(name)
            .ok_or_else(|| HarnessError::UnknownModel(name.to_string()))
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.models.contains_key(name) {
            return Err(HarnessError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}
