//! In-memory store for answers presented through `present_answer`.
//!
//! Created once in `main` and handed to the capabilities that need it as an
//! `Arc<AnswerStore>`. Creation is insert-if-absent; updates are
//! compare-and-swap on the answer's version.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::diff::DiffStats;
use crate::error::CapabilityError;
use crate::types::LineChange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Answer not found: {0}")]
    NotFound(String),
    #[error("Version conflict for answer {id}: expected version {expected}, current version is {actual}")]
    VersionConflict { id: String, expected: u64, actual: u64 },
    #[error("Answer store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for CapabilityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => CapabilityError::NotFound(err.to_string()),
            StoreError::VersionConflict { .. } => CapabilityError::InvalidArgument(err.to_string()),
            StoreError::Poisoned => CapabilityError::Execution(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnswer {
    pub id: String,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<BTreeMap<u32, LineChange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DiffStats>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredAnswer {
    /// A fresh answer with a random id at version 1.
    pub fn new(answer: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: 1,
            title: None,
            answer: answer.into(),
            path: None,
            changes: None,
            preview: None,
            stats: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default)]
pub struct AnswerStore {
    entries: RwLock<HashMap<String, StoredAnswer>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `answer` unless its id is already taken. Returns whether it was inserted.
    pub fn insert_if_absent(&self, answer: StoredAnswer) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if entries.contains_key(&answer.id) {
            return Ok(false);
        }
        entries.insert(answer.id.clone(), answer);
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredAnswer>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(id).cloned())
    }

    /// Apply `update` if the stored version still equals `expected_version`.
    ///
    /// The version is bumped and `updated_at` refreshed; the new state is returned.
    pub fn compare_and_swap<F>(
        &self,
        id: &str,
        expected_version: u64,
        update: F,
    ) -> Result<StoredAnswer, StoreError>
    where
        F: FnOnce(&mut StoredAnswer),
    {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let current = entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }

        let mut next = current.clone();
        update(&mut next);
        next.id = current.id.clone();
        next.created_at = current.created_at;
        next.version = current.version + 1;
        next.updated_at = Utc::now();
        *current = next.clone();
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_if_absent() {
        let store = AnswerStore::new();
        let answer = StoredAnswer::new("42");
        let id = answer.id.clone();
        assert!(store.insert_if_absent(answer.clone()).unwrap());
        assert!(!store.insert_if_absent(answer).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().unwrap().answer, "42");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_compare_and_swap() {
        let store = AnswerStore::new();
        let answer = StoredAnswer::new("first");
        let id = answer.id.clone();
        store.insert_if_absent(answer).unwrap();

        let updated = store
            .compare_and_swap(&id, 1, |a| a.answer = "second".to_string())
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.answer, "second");

        let stale = store.compare_and_swap(&id, 1, |a| a.answer = "third".to_string());
        assert_eq!(
            stale.unwrap_err(),
            StoreError::VersionConflict {
                id: id.clone(),
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(store.get(&id).unwrap().unwrap().answer, "second");
    }

    #[test]
    fn test_update_cannot_change_identity() {
        let store = AnswerStore::new();
        let answer = StoredAnswer::new("a");
        let id = answer.id.clone();
        store.insert_if_absent(answer).unwrap();
        let updated = store
            .compare_and_swap(&id, 1, |a| {
                a.id = "hijacked".to_string();
                a.version = 99;
            })
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn test_cas_missing_id() {
        let store = AnswerStore::new();
        let err = store.compare_and_swap("nope", 1, |_| {}).unwrap_err();
        assert_eq!(err, StoreError::NotFound("nope".to_string()));
        let cap: CapabilityError = err.into();
        assert_eq!(cap.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let store = Arc::new(AnswerStore::new());
        let answer = StoredAnswer::new("0");
        let id = answer.id.clone();
        store.insert_if_absent(answer).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    let mut applied = 0;
                    while applied < 25 {
                        let current = store.get(&id).unwrap().unwrap();
                        if store
                            .compare_and_swap(&id, current.version, |a| {
                                let n: u64 = a.answer.parse().unwrap();
                                a.answer = (n + 1).to_string();
                            })
                            .is_ok()
                        {
                            applied += 1;
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let final_answer = store.get(&id).unwrap().unwrap();
        assert_eq!(final_answer.answer, "100");
        assert_eq!(final_answer.version, 101);
    }
}
