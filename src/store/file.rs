//! Persistence of pending PR records as TOML files.
//!
//! Layout: `<root>/<organization>/<name>/<branch>.toml`, with the branch
//! percent-encoded so `release/1.0` stays a single file.

use super::Store;
use crate::error::{Error, Result};
use crate::types::{PendingPr, RepoRef};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of record files
const RECORD_EXT: &str = "toml";

/// Header written above every record
const HEADER: &str = "# magic-mirror pending PR record\n# Auto-generated - manual edits may be overwritten\n\n";

/// Store backed by a directory of TOML files
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn repo_dir(&self, repo: &RepoRef) -> PathBuf {
        self.root
            .join(urlencoding::encode(&repo.organization).as_ref())
            .join(urlencoding::encode(&repo.name).as_ref())
    }

    /// Path of the record file for a fork branch
    pub fn record_path(&self, repo: &RepoRef, branch: &str) -> PathBuf {
        self.repo_dir(repo)
            .join(format!("{}.{RECORD_EXT}", urlencoding::encode(branch)))
    }

    fn load(path: &Path) -> Result<PendingPr> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| Error::Store(format!("failed to parse {}: {e}", path.display())))
    }
}

impl Store for FileStore {
    fn get(&self, repo: &RepoRef, branch: &str) -> Result<Option<PendingPr>> {
        let path = self.record_path(repo, branch);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    fn put(&self, record: &PendingPr) -> Result<()> {
        let dir = self.repo_dir(&record.repo);
        let path = self.record_path(&record.repo, &record.branch);

        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;
        }

        let content = toml::to_string_pretty(record)
            .map_err(|e| Error::Store(format!("failed to serialize record: {e}")))?;

        // Write then rename so readers never observe a partial record
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, format!("{HEADER}{content}"))
            .map_err(|e| Error::Store(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Store(format!("failed to replace {}: {e}", path.display())))?;

        Ok(())
    }

    fn list(&self, repo: &RepoRef) -> Result<Vec<PendingPr>> {
        let dir = self.repo_dir(repo);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| Error::Store(format!("failed to list {}: {e}", dir.display())))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::Store(format!("failed to list {}: {e}", dir.display())))?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                records.push(Self::load(&path)?);
            }
        }
        records.sort_by(|a, b| a.branch.cmp(&b.branch));
        Ok(records)
    }
}
