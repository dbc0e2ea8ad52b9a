//! Configuration file for the `mirror` binary

use crate::error::{Error, Result};
use crate::gate::{GatePolicy, OWNERS_FILE};
use crate::types::RepoRef;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name used under the platform data dir when `state_dir` is unset
const DEFAULT_STATE_DIR: &str = "magic-mirror";

fn default_owners_file() -> String {
    OWNERS_FILE.to_string()
}

/// Mirror configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Fork receiving mirrored PRs
    pub fork: RepoRef,
    /// Upstream repository being mirrored
    pub upstream: RepoRef,
    /// Fork branches to evaluate
    pub branches: Vec<String>,
    /// Require an owner's approving review before merging
    #[serde(default)]
    pub require_owner_approval: bool,
    /// Ownership file path at the branch tip
    #[serde(default = "default_owners_file")]
    pub owners_file: String,
    /// Where pending PR records are stored
    pub state_dir: Option<PathBuf>,
    /// GitHub Enterprise host (None for github.com)
    pub host: Option<String>,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate config text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (label, repo) in [("fork", &self.fork), ("upstream", &self.upstream)] {
            if repo.organization.trim().is_empty() || repo.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "{label} needs a non-empty organization and name"
                )));
            }
        }
        if self.branches.is_empty() {
            return Err(Error::Config("at least one branch is required".to_string()));
        }
        if let Some(empty) = self.branches.iter().find(|b| b.trim().is_empty()) {
            return Err(Error::Config(format!("invalid branch name '{empty}'")));
        }
        Ok(())
    }

    /// Gate policy derived from this config
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            require_owner_approval: self.require_owner_approval,
            owners_file: self.owners_file.clone(),
        }
    }

    /// Resolved state directory
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(DEFAULT_STATE_DIR))
            .ok_or_else(|| Error::Config("no data directory, set state_dir".to_string()))
    }
}
