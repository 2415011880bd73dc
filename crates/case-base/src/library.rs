//! The shared case library: one writer at a time, lock-free snapshot readers.
//!
//! Readers clone an `Arc` to the current [`LibrarySnapshot`] and query it
//! without holding any lock, so a query always sees one complete state.
//! Writers serialize on a mutex, build the next snapshot from a copy of the
//! current one and publish it with a single pointer swap.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use printwise_geometry::FeatureVector;
use tracing::{info, instrument};

use crate::case::{Case, CaseId};
use crate::config::RetrievalConfig;
use crate::error::CaseError;
use crate::index::{Neighbor, SimilarityIndex};
use crate::ranking::{Lesson, RetrievalRanker};
use crate::repository::CaseRepository;
use crate::statistics::Statistics;

/// A consistent repository state and the index derived from it.
#[derive(Debug, Clone)]
pub struct LibrarySnapshot {
    pub repository: CaseRepository,
    pub index: SimilarityIndex,
}

impl LibrarySnapshot {
    pub fn new(config: &RetrievalConfig, repository: CaseRepository) -> Self {
        let index = SimilarityIndex::build(config, &repository);
        Self { repository, index }
    }
}

/// Case repository, similarity index and ranker behind the single-writer
/// discipline.
pub struct CaseLibrary {
    config: RetrievalConfig,
    ranker: RetrievalRanker,
    current: RwLock<Arc<LibrarySnapshot>>,
    writer: Mutex<()>,
}

impl CaseLibrary {
    pub fn new(config: RetrievalConfig) -> Result<Self, CaseError> {
        Self::with_repository(config, CaseRepository::new())
    }

    pub fn with_repository(config: RetrievalConfig, repository: CaseRepository) -> Result<Self, CaseError> {
        config.validate()?;
        let snapshot = LibrarySnapshot::new(&config, repository);
        Ok(Self {
            ranker: RetrievalRanker::new(&config),
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The state visible right now. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<LibrarySnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.snapshot().repository.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: CaseId) -> Option<Case> {
        self.snapshot().repository.get(id).cloned()
    }

    pub fn cases(&self) -> Vec<Case> {
        self.snapshot().repository.iter().cloned().collect()
    }

    pub fn statistics(&self) -> Statistics {
        self.snapshot().repository.statistics()
    }

    /// The `k` nearest cases to `vector`.
    #[instrument(skip(self, vector))]
    pub fn query(&self, vector: &FeatureVector, k: usize) -> Vec<Neighbor> {
        self.snapshot().index.query(vector, k)
    }

    /// Nearest cases ranked into lessons, both steps on the same snapshot.
    #[instrument(skip(self, vector))]
    pub fn retrieve(&self, vector: &FeatureVector, k: usize) -> Vec<Lesson> {
        let snapshot = self.snapshot();
        let neighbors = snapshot.index.query(vector, k);
        let lessons = self.ranker.rank(&neighbors, &snapshot.repository);
        info!(
            neighbors = neighbors.len(),
            top_score = lessons.first().map(|l| l.score),
            "retrieval complete"
        );
        lessons
    }

    /// Retrieve with the configured default neighbor count.
    pub fn retrieve_default(&self, vector: &FeatureVector) -> Vec<Lesson> {
        self.retrieve(vector, self.config.default_neighbors)
    }

    /// Apply one write. `update` works on a private copy of the current
    /// snapshot; nothing is published if it fails.
    pub(crate) fn write<T>(
        &self,
        update: impl FnOnce(&mut LibrarySnapshot) -> Result<T, CaseError>,
    ) -> Result<T, CaseError> {
        let _writer = self.writer.lock();
        let mut next = LibrarySnapshot::clone(&self.snapshot());
        let out = update(&mut next)?;
        *self.current.write() = Arc::new(next);
        Ok(out)
    }

    /// Replace the whole repository, rebuilding the index before the swap.
    pub(crate) fn replace(&self, repository: CaseRepository) {
        let _writer = self.writer.lock();
        let next = LibrarySnapshot::new(&self.config, repository);
        *self.current.write() = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ParameterSet;
    use crate::repository::tests::features;
    use chrono::Utc;

    #[test]
    fn test_failed_write_publishes_nothing() {
        let library = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        let result: Result<(), CaseError> = library.write(|snap| {
            snap.repository
                .append(features(10.0, 0.0), "PLA", ParameterSet::new(), None, Utc::now())?;
            Err(CaseError::collaborator("boom"))
        });
        assert!(result.is_err());
        assert!(library.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let library = CaseLibrary::new(RetrievalConfig::default()).unwrap();
        let before = library.snapshot();
        library
            .write(|snap| {
                let id = snap.repository.append(
                    features(10.0, 0.0),
                    "PLA",
                    ParameterSet::new(),
                    None,
                    Utc::now(),
                )?;
                snap.index.insert(id, &features(10.0, 0.0));
                Ok(id)
            })
            .unwrap();
        assert!(before.repository.is_empty());
        assert!(before.index.is_empty());
        assert_eq!(library.len(), 1);
        assert_eq!(library.query(&features(10.0, 0.0), 1)[0].distance, 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RetrievalConfig::default();
        config.default_neighbors = 0;
        assert!(matches!(CaseLibrary::new(config), Err(CaseError::InvalidConfig { .. })));
    }
}
