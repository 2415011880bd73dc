//! The authoritative case store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use printwise_geometry::FeatureVector;

use crate::case::{Case, CaseId, Outcome, ParameterSet};
use crate::error::{CaseError, SnapshotError};
use crate::statistics::Statistics;

/// Cases ordered by id.
///
/// Ids are assigned in increasing order starting at 1 and are never reused.
/// After a case is appended only its outcome, notes and generated parameters
/// can change.
#[derive(Debug, Clone)]
pub struct CaseRepository {
    cases: BTreeMap<CaseId, Case>,
    next_id: u64,
}

impl Default for CaseRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseRepository {
    pub fn new() -> Self {
        Self {
            cases: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild a repository from stored cases, rejecting duplicate ids and
    /// invalid records. `next_id` is raised past the largest id present.
    pub fn from_cases(
        cases: impl IntoIterator<Item = Case>,
        next_id: Option<u64>,
    ) -> Result<Self, SnapshotError> {
        let mut map = BTreeMap::new();
        for case in cases {
            case.validate()
                .map_err(|reason| SnapshotError::InvalidCase { id: case.id, reason })?;
            let id = case.id;
            if map.insert(id, case).is_some() {
                return Err(SnapshotError::DuplicateId(id));
            }
        }
        let after_last = map.keys().next_back().map_or(1, |id: &CaseId| id.0 + 1);
        Ok(Self {
            cases: map,
            next_id: next_id.unwrap_or(1).max(after_last),
        })
    }

    /// Append a new case with outcome unset.
    pub fn append(
        &mut self,
        features: FeatureVector,
        material: impl Into<String>,
        parameters: ParameterSet,
        rationale: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<CaseId, CaseError> {
        features
            .check_invariants()
            .map_err(|reason| CaseError::InvalidFeatures { reason })?;
        let material = material.into();
        if material.trim().is_empty() {
            return Err(CaseError::InvalidFeatures {
                reason: "material label is empty".into(),
            });
        }

        let id = CaseId(self.next_id);
        self.next_id += 1;
        self.cases.insert(
            id,
            Case {
                id,
                features,
                material,
                parameters,
                rationale,
                outcome: Outcome::Unset,
                notes: None,
                created_at,
                outcome_recorded_at: None,
            },
        );
        Ok(id)
    }

    /// Fill in (or overwrite) the outcome of a case. `Unset` is rejected.
    pub fn set_outcome(
        &mut self,
        id: CaseId,
        outcome: Outcome,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), CaseError> {
        if !outcome.is_set() {
            return Err(CaseError::InvalidOutcome {
                value: outcome.as_str().into(),
            });
        }
        let case = self.cases.get_mut(&id).ok_or(CaseError::NotFound { id })?;
        case.outcome = outcome;
        case.notes = notes;
        case.outcome_recorded_at = Some(at);
        Ok(())
    }

    /// Attach generated parameters to an existing case.
    pub fn set_parameters(
        &mut self,
        id: CaseId,
        parameters: ParameterSet,
        rationale: Option<String>,
    ) -> Result<(), CaseError> {
        let case = self.cases.get_mut(&id).ok_or(CaseError::NotFound { id })?;
        case.parameters = parameters;
        case.rationale = rationale;
        Ok(())
    }

    pub fn get(&self, id: CaseId) -> Option<&Case> {
        self.cases.get(&id)
    }

    pub fn contains(&self, id: CaseId) -> bool {
        self.cases.contains_key(&id)
    }

    /// All cases in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.values()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// The id the next append will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_cases(self.iter())
    }
}
