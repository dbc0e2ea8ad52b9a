//! Durable storage for pending PR records
//!
//! Records are keyed by fork and branch. Writes are last-write-wins; callers
//! serialize evaluation per `(repo, branch)` so that is sufficient.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{PendingPr, RepoRef};

/// Composite key of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    /// Fork organization
    pub organization: String,
    /// Fork repository name
    pub name: String,
    /// Fork branch
    pub branch: String,
}

impl StoreKey {
    /// Key for a fork branch
    pub fn new(repo: &RepoRef, branch: &str) -> Self {
        Self {
            organization: repo.organization.clone(),
            name: repo.name.clone(),
            branch: branch.to_string(),
        }
    }

    /// Key under which `record` is stored
    pub fn of(record: &PendingPr) -> Self {
        Self::new(&record.repo, &record.branch)
    }
}

/// Read/write contract for pending PR records
pub trait Store: Send + Sync {
    /// Latest record for a fork branch
    fn get(&self, repo: &RepoRef, branch: &str) -> Result<Option<PendingPr>>;

    /// Insert or replace the record for its fork branch
    fn put(&self, record: &PendingPr) -> Result<()>;

    /// All records of a fork, ordered by branch
    fn list(&self, repo: &RepoRef) -> Result<Vec<PendingPr>>;
}
