//! Failure-record storage used by the graveyard engine.

pub mod database;
pub mod schema;

use parking_lot::Mutex;

use crate::errors::CortexResult;
use crate::models::{FailureRecord, NewFailure};

pub use database::SqliteFailureStore;

/// Result of asking a store to shortlist candidates for a token query.
#[derive(Clone, Debug, PartialEq)]
pub enum Narrowing {
    /// Best-first candidates drawn from the recent window. May be empty.
    Candidates(Vec<FailureRecord>),
    /// The store has no index; the caller should scan the window itself.
    Unsupported,
}

pub trait FailureStore {
    fn append_failure(&self, failure: NewFailure) -> CortexResult<FailureRecord>;

    /// Up to `limit` records, newest first.
    fn recent_failures(&self, limit: usize) -> CortexResult<Vec<FailureRecord>>;

    fn narrow_candidates(
        &self,
        _tokens: &[String],
        _window: usize,
        _candidate_limit: usize,
    ) -> CortexResult<Narrowing> {
        Ok(Narrowing::Unsupported)
    }
}

impl<S: FailureStore + ?Sized> FailureStore for &S {
    fn append_failure(&self, failure: NewFailure) -> CortexResult<FailureRecord> {
        (**self).append_failure(failure)
    }

    fn recent_failures(&self, limit: usize) -> CortexResult<Vec<FailureRecord>> {
        (**self).recent_failures(limit)
    }

    fn narrow_candidates(
        &self,
        tokens: &[String],
        window: usize,
        candidate_limit: usize,
    ) -> CortexResult<Narrowing> {
        (**self).narrow_candidates(tokens, window, candidate_limit)
    }
}

pub(crate) fn sorted_unique(items: &[String]) -> Vec<String> {
    let mut out = items.to_vec();
    out.sort();
    out.dedup();
    out
}

pub(crate) fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// In-process store with sequential ids starting at 1. No narrowing index.
#[derive(Default)]
pub struct MemoryFailureStore {
    records: Mutex<Vec<FailureRecord>>,
}

impl MemoryFailureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl FailureStore for MemoryFailureStore {
    fn append_failure(&self, failure: NewFailure) -> CortexResult<FailureRecord> {
        let mut records = self.records.lock();
        let record = FailureRecord {
            id: records.len() as i64 + 1,
            session_id: failure.session_id,
            summary: failure.summary,
            reason: failure.reason,
            files: failure.files,
            keywords: sorted_unique(&failure.keywords),
            created_at: utc_now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    fn recent_failures(&self, limit: usize) -> CortexResult<Vec<FailureRecord>> {
        let records = self.records.lock();
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(summary: &str) -> NewFailure {
        NewFailure {
            summary: summary.to_string(),
            reason: "because".to_string(),
            files: vec!["b.py".to_string(), "a.py".to_string(), "a.py".to_string()],
            keywords: vec!["zeta".to_string(), "alpha".to_string()],
            ..NewFailure::default()
        }
    }

    #[test]
    fn test_memory_store_assigns_sequential_ids() {
        let store = MemoryFailureStore::new();
        assert!(store.is_empty());
        let first = store.append_failure(failure("one")).unwrap();
        let second = store.append_failure(failure("two")).unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.len(), 2);
        // Files keep the caller's order; keywords are a sorted set.
        assert_eq!(first.files, vec!["b.py".to_string(), "a.py".to_string(), "a.py".to_string()]);
        assert_eq!(first.keywords, vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(first.created_at.ends_with('Z'));
    }

    #[test]
    fn test_memory_store_recent_is_newest_first() {
        let store = MemoryFailureStore::new();
        for name in ["a", "b", "c"] {
            store.append_failure(failure(name)).unwrap();
        }
        let recent = store.recent_failures(2).unwrap();
        let ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_memory_store_does_not_narrow() {
        let store = MemoryFailureStore::new();
        let narrowing = store.narrow_candidates(&["cache".to_string()], 10, 5).unwrap();
        assert_eq!(narrowing, Narrowing::Unsupported);
    }
}
