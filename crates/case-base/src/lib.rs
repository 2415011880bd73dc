//! Case-based retrieval for print-parameter advice.
//!
//! Each analyzed model becomes a [`Case`] in a [`CaseRepository`]. New models
//! are matched against past cases through a [`SimilarityIndex`], and the
//! [`RetrievalRanker`] weighs each match by how the earlier print turned out.
//! [`CaseLibrary`] ties these together behind a single-writer, snapshot-reader
//! discipline and owns feedback ingestion and snapshot export/import.

pub mod advisor;
pub mod case;
pub mod config;
pub mod error;
pub mod feedback;
pub mod index;
pub mod library;
pub mod ranking;
pub mod repository;
pub mod snapshot;
pub mod statistics;

pub use advisor::{Advice, Advisor, FeatureSummary, GeneratedProfile, ParameterGenerator};
pub use case::{Case, CaseId, Outcome, ParameterSet};
pub use config::{Normalization, OutcomeWeights, RetrievalConfig, SimilarityKernel};
pub use error::{CaseError, SnapshotError};
pub use index::{Neighbor, SimilarityIndex};
pub use library::{CaseLibrary, LibrarySnapshot};
pub use ranking::{Lesson, LessonKind, RetrievalRanker};
pub use repository::CaseRepository;
pub use snapshot::{export_repository, import_repository, FORMAT, FORMAT_VERSION};
pub use statistics::Statistics;
