use printwise_geometry::GeometryError;

use crate::case::CaseId;

/// Errors during snapshot export and import.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to parse snapshot: {0}")]
    Parse(String),

    #[error("unknown snapshot format: {0}")]
    UnknownFormat(String),

    #[error("snapshot version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("case id {0} appears more than once")]
    DuplicateId(CaseId),

    #[error("case {id} is invalid: {reason}")]
    InvalidCase { id: CaseId, reason: String },

    #[error("snapshot i/o failed: {0}")]
    Io(String),
}

/// Errors from the case library.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaseError {
    #[error("case not found: {id}")]
    NotFound { id: CaseId },

    #[error("invalid outcome {value:?}: expected success, failure or neutral")]
    InvalidOutcome { value: String },

    #[error("invalid feature vector: {reason}")]
    InvalidFeatures { reason: String },

    #[error("invalid retrieval configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("geometry analysis failed: {0}")]
    Geometry(#[from] GeometryError),

    #[error("parameter generation failed: {reason}")]
    Collaborator { reason: String },
}

impl CaseError {
    pub fn collaborator(reason: impl Into<String>) -> Self {
        CaseError::Collaborator {
            reason: reason.into(),
        }
    }
}
