//! Error types for magic-mirror

use thiserror::Error;

/// Errors produced by the mirror engine
#[derive(Debug, Error)]
pub enum Error {
    /// A call against the GitHub API failed
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// The request never got an answer from GitHub (connection, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// Branch or content lookup failed (transient, never a default gate state)
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Repository content could not be decoded
    #[error("failed to decode content: {0}")]
    ContentDecode(String),

    /// Creating the tracking issue failed
    #[error("failed to report sync failure: {0}")]
    Report(String),

    /// A record was used in a way its current state does not allow
    #[error("invalid pending PR record: {0}")]
    InvalidRecord(String),

    /// Reading or writing the pending PR store failed
    #[error("store error: {0}")]
    Store(String),

    /// Configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable credentials
    #[error("authentication error: {0}")]
    Auth(String),
}

impl From<octocrab::Error> for Error {
    fn from(e: octocrab::Error) -> Self {
        match e {
            // Only the GitHub variant carries a response from the host
            octocrab::Error::GitHub { .. } => Self::GitHubApi(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
