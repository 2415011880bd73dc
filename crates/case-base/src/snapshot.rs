//! Full-repository export and import as a self-describing JSON document.
//!
//! Import is all-or-nothing: the document is parsed, migrated and validated
//! into a fresh repository first, and only then swapped into the library.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::case::Case;
use crate::error::{CaseError, SnapshotError};
use crate::library::CaseLibrary;
use crate::repository::CaseRepository;
use crate::statistics::Statistics;

/// Format identifier written into every export.
pub const FORMAT: &str = "printwise-cases";

/// Current export format version.
pub const FORMAT_VERSION: u32 = 1;

/// The exported document.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument<'a> {
    pub format: &'static str,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub statistics: Statistics,
    pub next_id: u64,
    pub cases: Vec<&'a Case>,
}

/// The document as read back. Cases stay untyped until migration has run.
#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    format: String,
    version: u32,
    #[serde(default)]
    next_id: Option<u64>,
    cases: Vec<Value>,
}

/// Serialize a repository to a pretty-printed JSON string.
pub fn export_repository(repository: &CaseRepository) -> Result<String, SnapshotError> {
    let doc = document(repository);
    serde_json::to_string_pretty(&doc).map_err(|e| SnapshotError::Io(e.to_string()))
}

fn document(repository: &CaseRepository) -> ExportDocument<'_> {
    ExportDocument {
        format: FORMAT,
        version: FORMAT_VERSION,
        exported_at: Utc::now(),
        statistics: repository.statistics(),
        next_id: repository.next_id(),
        cases: repository.iter().collect(),
    }
}

/// Parse, migrate and validate a document into a new repository.
pub fn import_repository(json: &str) -> Result<CaseRepository, SnapshotError> {
    let raw: RawDocument =
        serde_json::from_str(json).map_err(|e| SnapshotError::Parse(e.to_string()))?;

    if raw.format != FORMAT {
        return Err(SnapshotError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(SnapshotError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let cases = if raw.version < FORMAT_VERSION {
        migrate(raw.cases, raw.version, FORMAT_VERSION)?
    } else {
        raw.cases
    };

    let cases = cases
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value::<Case>(value)
                .map_err(|e| SnapshotError::Parse(format!("case #{i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    CaseRepository::from_cases(cases, raw.next_id)
}

/// Apply format migrations from `from_version` to `to_version`.
///
/// Version 1 is the first format, so there is no older version to lift.
/// Add a step per version here as the format evolves.
fn migrate(cases: Vec<Value>, from_version: u32, to_version: u32) -> Result<Vec<Value>, SnapshotError> {
    if from_version != to_version {
        return Err(SnapshotError::MigrationFailed {
            from: from_version,
            to: to_version,
            reason: format!("no migration path from v{from_version} to v{to_version}"),
        });
    }
    Ok(cases)
}

impl CaseLibrary {
    /// Export the current snapshot as a JSON string.
    #[instrument(skip(self))]
    pub fn export_to_string(&self) -> Result<String, CaseError> {
        let snapshot = self.snapshot();
        let json = export_repository(&snapshot.repository)?;
        info!(cases = snapshot.repository.len(), bytes = json.len(), "repository exported");
        Ok(json)
    }

    /// Export the current snapshot to a writer.
    pub fn export_to_writer<W: Write>(&self, writer: W) -> Result<(), CaseError> {
        let snapshot = self.snapshot();
        serde_json::to_writer_pretty(writer, &document(&snapshot.repository))
            .map_err(|e| SnapshotError::Io(e.to_string()))?;
        Ok(())
    }

    /// Replace the library contents with an exported document. On any error
    /// the library is left exactly as it was.
    #[instrument(skip(self, json), fields(bytes = json.len()))]
    pub fn import_from_str(&self, json: &str) -> Result<(), CaseError> {
        let repository = import_repository(json)?;
        let cases = repository.len();
        self.replace(repository);
        info!(cases, "repository imported");
        Ok(())
    }

    pub fn import_from_reader<R: Read>(&self, mut reader: R) -> Result<(), CaseError> {
        let mut json = String::new();
        reader
            .read_to_string(&mut json)
            .map_err(|e| SnapshotError::Io(e.to_string()))?;
        self.import_from_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseId, Outcome};
    use crate::config::RetrievalConfig;
    use crate::repository::tests::features;

    fn populated() -> CaseLibrary {
        let lib = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        for (w, o) in [(10.0, Outcome::Success), (20.0, Outcome::Failure), (30.0, Outcome::Unset)] {
            let id = lib.record_analysis(features(w, 0.1), "PLA").unwrap();
            if o.is_set() {
                lib.record_outcome(id, o, Some("note")).unwrap();
            }
        }
        lib
    }

    #[test]
    fn test_document_is_self_describing() {
        let json = populated().export_to_string().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], FORMAT);
        assert_eq!(value["version"], FORMAT_VERSION);
        assert_eq!(value["statistics"]["total_cases"], 3);
        assert_eq!(value["cases"].as_array().unwrap().len(), 3);
        assert_eq!(value["cases"][1]["outcome"], "failure");
    }

    #[test]
    fn test_round_trip_preserves_cases_and_ids() {
        let lib = populated();
        let json = lib.export_to_string().unwrap();
        let other = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        other.import_from_str(&json).unwrap();
        assert_eq!(other.cases(), lib.cases());
        let next = other.record_analysis(features(40.0, 0.0), "PLA").unwrap();
        assert_eq!(next, CaseId(4));
    }

    #[test]
    fn test_writer_and_reader() {
        let lib = populated();
        let mut buf = Vec::new();
        lib.export_to_writer(&mut buf).unwrap();
        let other = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        other.import_from_reader(buf.as_slice()).unwrap();
        assert_eq!(other.len(), 3);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let lib = populated();
        let mut value: Value = serde_json::from_str(&lib.export_to_string().unwrap()).unwrap();
        value["producer"] = Value::from("a newer build");
        value["cases"][0]["print_time_minutes"] = Value::from(42);
        value["cases"][0]["features"]["curvature"] = Value::from(0.5);
        let other = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        other.import_from_str(&value.to_string()).unwrap();
        assert_eq!(other.cases(), lib.cases());
    }

    #[test]
    fn test_bad_documents_leave_library_untouched() {
        let lib = populated();
        let before = lib.cases();
        let good: Value = serde_json::from_str(&lib.export_to_string().unwrap()).unwrap();

        let mut wrong_format = good.clone();
        wrong_format["format"] = Value::from("something-else");
        let mut future = good.clone();
        future["version"] = Value::from(FORMAT_VERSION + 1);
        let mut dup = good.clone();
        let first = dup["cases"][0].clone();
        dup["cases"].as_array_mut().unwrap().push(first);
        let mut bad_ratio = good.clone();
        bad_ratio["cases"][2]["features"]["overhang_ratio"] = Value::from(3.0);

        let cases = [
            ("{ not json".to_string(), "parse"),
            (wrong_format.to_string(), "format"),
            (future.to_string(), "version"),
            (dup.to_string(), "more than once"),
            (bad_ratio.to_string(), "overhang_ratio"),
        ];
        for (doc, expected) in cases {
            let err = lib.import_from_str(&doc).unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
            assert_eq!(lib.cases(), before);
        }
    }

    #[test]
    fn test_old_version_without_migration_fails() {
        let lib = populated();
        let mut value: Value = serde_json::from_str(&lib.export_to_string().unwrap()).unwrap();
        value["version"] = Value::from(0);
        let err = import_repository(&value.to_string()).unwrap_err();
        assert!(matches!(err, SnapshotError::MigrationFailed { from: 0, to: 1, .. }));
    }
}
