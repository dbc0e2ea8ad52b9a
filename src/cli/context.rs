//! Shared command context for CLI commands
//!
//! Extracts the setup shared by evaluate and status.

use magic_mirror::config::Config;
use magic_mirror::error::{Error, Result};
use magic_mirror::platform::GitHubService;
use magic_mirror::store::FileStore;
use std::path::Path;

/// Loaded configuration plus the record store it points at
pub struct CommandContext {
    /// Parsed configuration
    pub config: Config,
    /// Pending PR records
    pub store: FileStore,
}

impl CommandContext {
    /// Load the config file and open its store
    pub fn new(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        let store = FileStore::new(config.state_dir()?);
        Ok(Self { config, store })
    }

    /// Create the GitHub service for the configured host
    pub fn platform(&self, token: &str) -> Result<GitHubService> {
        if token.trim().is_empty() {
            return Err(Error::Auth("GITHUB_TOKEN is empty".to_string()));
        }
        GitHubService::new(token, self.config.host.as_deref())
    }

    /// Branches to evaluate: the requested ones, or all configured
    pub fn branches<'a>(&'a self, requested: &'a [String]) -> &'a [String] {
        if requested.is_empty() {
            &self.config.branches
        } else {
            requested
        }
    }
}
