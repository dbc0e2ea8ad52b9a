//! In-memory store

use super::{Store, StoreKey};
use crate::error::{Error, Result};
use crate::types::{PendingPr, RepoRef};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<StoreKey, PendingPr>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<StoreKey, PendingPr>>> {
        self.records
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn get(&self, repo: &RepoRef, branch: &str) -> Result<Option<PendingPr>> {
        Ok(self.lock()?.get(&StoreKey::new(repo, branch)).cloned())
    }

    fn put(&self, record: &PendingPr) -> Result<()> {
        self.lock()?.insert(StoreKey::of(record), record.clone());
        Ok(())
    }

    fn list(&self, repo: &RepoRef) -> Result<Vec<PendingPr>> {
        Ok(self
            .lock()?
            .values()
            .filter(|r| &r.repo == repo)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(branch: &str) -> PendingPr {
        PendingPr::new(
            RepoRef::new("acme", "widgets"),
            RepoRef::new("upstream", "widgets"),
            branch,
            vec![1],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get(&RepoRef::new("acme", "widgets"), "main").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_record_for_branch() {
        let store = MemoryStore::new();
        let first = record("main").with_pr(1);
        store.put(&first).unwrap();
        let second = record("main").with_pr(2);
        store.put(&second).unwrap();

        let loaded = store.get(&first.repo, "main").unwrap().unwrap();
        assert_eq!(loaded.pr_id, Some(2));
        assert_eq!(store.list(&first.repo).unwrap().len(), 1);
    }

    #[test]
    fn test_list_filters_by_repo() {
        let store = MemoryStore::new();
        store.put(&record("main")).unwrap();
        store.put(&record("release")).unwrap();
        let mut other = record("main");
        other.repo = RepoRef::new("acme", "gadgets");
        store.put(&other).unwrap();

        let listed = store.list(&RepoRef::new("acme", "widgets")).unwrap();
        let branches: Vec<_> = listed.iter().map(|r| r.branch.as_str()).collect();
        assert_eq!(branches, vec!["main", "release"]);
    }
}
