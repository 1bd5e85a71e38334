//! Result store collaborator: append-only from the session controller's view
//! (it only ever calls `save`); listing, lookup, and bulk replace belong to
//! reporting and backup flows.

use crate::domain::TestResult;
use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Persistence for completed test results.
pub trait ResultStore: Send + Sync {
    fn save(&self, result: &TestResult) -> CoreResult<()>;
    fn list_all(&self) -> CoreResult<Vec<TestResult>>;
    fn get_by_id(&self, id: &str) -> CoreResult<Option<TestResult>>;
    /// Bulk replace, for restoring a backup.
    fn replace_all(&self, results: &[TestResult]) -> CoreResult<()>;
}

impl<T: ResultStore + ?Sized> ResultStore for std::sync::Arc<T> {
    fn save(&self, result: &TestResult) -> CoreResult<()> {
        (**self).save(result)
    }

    fn list_all(&self) -> CoreResult<Vec<TestResult>> {
        (**self).list_all()
    }

    fn get_by_id(&self, id: &str) -> CoreResult<Option<TestResult>> {
        (**self).get_by_id(id)
    }

    fn replace_all(&self, results: &[TestResult]) -> CoreResult<()> {
        (**self).replace_all(results)
    }
}

const RESULTS_TREE: &str = "results";

/// Result store backed by a local sled database; values are JSON-encoded
/// `TestResult` records keyed by result id.
pub struct SledResultStore {
    db: sled::Db,
}

impl SledResultStore {
    /// Open (or create) the store at `path` (e.g. `./data/cogniscreen`).
    pub fn open_path(path: &Path) -> CoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory sled instance, dropped on close. For tests and demos.
    pub fn temporary() -> CoreResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(Self { db })
    }

    fn tree(&self) -> CoreResult<sled::Tree> {
        Ok(self.db.open_tree(RESULTS_TREE)?)
    }
}

impl ResultStore for SledResultStore {
    fn save(&self, result: &TestResult) -> CoreResult<()> {
        let encoded = serde_json::to_vec(result)?;
        self.tree()?.insert(result.id.as_bytes(), encoded)?;
        info!(id = %result.id, total_score = result.total_score, "result saved");
        Ok(())
    }

    fn list_all(&self) -> CoreResult<Vec<TestResult>> {
        let mut out = Vec::new();
        for entry in self.tree()?.iter() {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(&value)?);
        }
        // Result ids are RFC 3339 timestamps; sled iterates keys in byte
        // order, so this is already chronological.
        Ok(out)
    }

    fn get_by_id(&self, id: &str) -> CoreResult<Option<TestResult>> {
        match self.tree()?.get(id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn replace_all(&self, results: &[TestResult]) -> CoreResult<()> {
        let tree = self.tree()?;
        tree.clear()?;
        for result in results {
            tree.insert(result.id.as_bytes(), serde_json::to_vec(result)?)?;
        }
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<TestResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryResultStore {
    fn save(&self, result: &TestResult) -> CoreResult<()> {
        self.results
            .lock()
            .map_err(|e| CoreError::Store(e.to_string()))?
            .push(result.clone());
        Ok(())
    }

    fn list_all(&self) -> CoreResult<Vec<TestResult>> {
        Ok(self
            .results
            .lock()
            .map_err(|e| CoreError::Store(e.to_string()))?
            .clone())
    }

    fn get_by_id(&self, id: &str) -> CoreResult<Option<TestResult>> {
        Ok(self.list_all()?.into_iter().find(|r| r.id == id))
    }

    fn replace_all(&self, results: &[TestResult]) -> CoreResult<()> {
        *self
            .results
            .lock()
            .map_err(|e| CoreError::Store(e.to_string()))? = results.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgeGroup, Answer, Gender, UserProfile};

    fn sample_result() -> TestResult {
        TestResult::new(
            UserProfile {
                name: "김철수".to_string(),
                gender: Gender::Male,
                age_group: AgeGroup::SeventiesPlus,
            },
            vec![Answer {
                question_id: 1,
                transcript: "2026년".to_string(),
                score: 1,
                explanation: "정답입니다.".to_string(),
            }],
        )
    }

    #[test]
    fn sled_store_round_trip() {
        let store = SledResultStore::temporary().unwrap();
        let result = sample_result();
        store.save(&result).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_score, 1);

        let found = store.get_by_id(&result.id).unwrap().unwrap();
        assert_eq!(found.profile.name, "김철수");
        assert!(store.get_by_id("없는-아이디").unwrap().is_none());
    }

    #[test]
    fn sled_replace_all_overwrites() {
        let store = SledResultStore::temporary().unwrap();
        store.save(&sample_result()).unwrap();
        store.save(&sample_result()).unwrap();

        let replacement = vec![sample_result()];
        store.replace_all(&replacement).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryResultStore::new();
        let result = sample_result();
        store.save(&result).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert!(store.get_by_id(&result.id).unwrap().is_some());
        store.replace_all(&[]).unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }
}
