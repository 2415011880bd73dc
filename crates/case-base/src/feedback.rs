//! Feedback ingestion: appending analyses and recording print outcomes.
//!
//! Every operation here is a single library write, so the repository and the
//! similarity index change together or not at all.

use chrono::Utc;
use printwise_geometry::FeatureVector;
use tracing::{info, instrument};

use crate::case::{CaseId, Outcome, ParameterSet};
use crate::error::CaseError;
use crate::library::CaseLibrary;

impl CaseLibrary {
    /// Store a freshly analyzed model with outcome unset.
    #[instrument(skip(self, features))]
    pub fn record_analysis(&self, features: FeatureVector, material: &str) -> Result<CaseId, CaseError> {
        self.record_generated(features, material, ParameterSet::new(), None)
    }

    /// Store an analyzed model together with the parameters generated for it.
    #[instrument(skip(self, features, parameters, rationale))]
    pub fn record_generated(
        &self,
        features: FeatureVector,
        material: &str,
        parameters: ParameterSet,
        rationale: Option<String>,
    ) -> Result<CaseId, CaseError> {
        let id = self.write(|snap| {
            let id = snap
                .repository
                .append(features.clone(), material, parameters, rationale, Utc::now())?;
            snap.index.insert(id, &features);
            Ok(id)
        })?;
        info!(%id, material, "case recorded");
        Ok(id)
    }

    /// Record the print result for an existing case. A later report
    /// overwrites an earlier one; `Unset` is rejected.
    #[instrument(skip(self, notes))]
    pub fn record_outcome(&self, id: CaseId, outcome: Outcome, notes: Option<&str>) -> Result<(), CaseError> {
        self.write(|snap| {
            snap.repository
                .set_outcome(id, outcome, notes.map(str::to_string), Utc::now())
        })?;
        info!(%id, %outcome, "outcome recorded");
        Ok(())
    }

    /// [`record_outcome`](Self::record_outcome) with the outcome given as text.
    pub fn record_outcome_label(&self, id: CaseId, outcome: &str, notes: Option<&str>) -> Result<(), CaseError> {
        let outcome: Outcome = outcome.parse()?;
        self.record_outcome(id, outcome, notes)
    }

    /// Record free-text feedback, inferring the outcome from its wording.
    /// The text itself is kept as the case notes.
    pub fn record_feedback_text(&self, id: CaseId, feedback: &str) -> Result<Outcome, CaseError> {
        let outcome = Outcome::infer_from_feedback(feedback);
        self.record_outcome(id, outcome, Some(feedback))?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::repository::tests::features;

    fn library() -> CaseLibrary {
        CaseLibrary::new(RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn test_record_analysis_indexes_case() {
        let lib = library();
        let id = lib.record_analysis(features(10.0, 0.1), "PLA").unwrap();
        assert_eq!(id, CaseId(1));
        let hits = lib.query(&features(10.0, 0.1), 1);
        assert_eq!(hits[0].id, id);
        assert_eq!(lib.get(id).unwrap().outcome, Outcome::Unset);
    }

    #[test]
    fn test_unknown_case_is_not_found() {
        let lib = library();
        let err = lib.record_outcome(CaseId(3), Outcome::Success, None).unwrap_err();
        assert_eq!(err, CaseError::NotFound { id: CaseId(3) });
        assert!(lib.is_empty());
    }

    #[test]
    fn test_invalid_label_changes_nothing() {
        let lib = library();
        let id = lib.record_analysis(features(10.0, 0.1), "PLA").unwrap();
        let err = lib.record_outcome_label(id, "meh", None).unwrap_err();
        assert!(matches!(err, CaseError::InvalidOutcome { .. }));
        let err = lib.record_outcome_label(id, "unset", None).unwrap_err();
        assert!(matches!(err, CaseError::InvalidOutcome { .. }));
        assert_eq!(lib.get(id).unwrap().outcome, Outcome::Unset);
    }

    #[test]
    fn test_feedback_text_sets_outcome_and_notes() {
        let lib = library();
        let id = lib.record_analysis(features(10.0, 0.1), "PETG").unwrap();
        let outcome = lib.record_feedback_text(id, "Came out great, supports worked").unwrap();
        assert_eq!(outcome, Outcome::Success);
        let case = lib.get(id).unwrap();
        assert_eq!(case.outcome, Outcome::Success);
        assert_eq!(case.notes.as_deref(), Some("Came out great, supports worked"));
        assert!(case.outcome_recorded_at.is_some());
    }

    #[test]
    fn test_generated_parameters_are_stored() {
        let lib = library();
        let mut params = ParameterSet::new();
        params.insert("layer_height".into(), serde_json::json!(0.2));
        let id = lib
            .record_generated(features(10.0, 0.1), "PLA", params.clone(), Some("standard".into()))
            .unwrap();
        let case = lib.get(id).unwrap();
        assert_eq!(case.parameters, params);
        assert_eq!(case.rationale.as_deref(), Some("standard"));
    }
}
