//! Core types for magic-mirror

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An organization/repository pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning organization or user
    pub organization: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a new repository reference
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

/// Lifecycle state of a mirrored change
///
/// `Blocked` carries the tracking issue number, so a blocked record
/// without an issue cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncAction {
    /// Waiting to be merged
    Pending,
    /// Merged into the fork
    Merged,
    /// Merge failed; syncing for the branch is paused until the issue is closed
    Blocked {
        /// Tracking issue on the fork
        issue: u64,
    },
}

impl SyncAction {
    /// Whether no further automatic transition is possible
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Merged => write!(f, "merged"),
            Self::Blocked { issue } => write!(f, "blocked (#{issue})"),
        }
    }
}

/// One mirrored PR (or a placeholder for a mirror that could not be opened)
/// linked to the upstream PRs it reproduces.
///
/// Scalar fields come before the nested tables so the record serializes
/// cleanly to TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPr {
    /// Fork branch being synced
    pub branch: String,
    /// Upstream PR numbers in the order they were combined
    pub upstream_pr_ids: Vec<u64>,
    /// Upstream PR authors, assigned to the tracking issue on failure
    #[serde(default)]
    pub upstream_authors: BTreeSet<String>,
    /// Mirrored PR number on the fork, absent if it could not be created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_id: Option<u64>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record last changed state
    pub updated_at: DateTime<Utc>,
    /// The fork
    pub repo: RepoRef,
    /// The upstream source
    pub upstream_repo: RepoRef,
    /// Current lifecycle state
    pub action: SyncAction,
}

impl PendingPr {
    /// Create a new `Pending` record
    ///
    /// Fails if `upstream_pr_ids` is empty.
    pub fn new(
        repo: RepoRef,
        upstream_repo: RepoRef,
        branch: impl Into<String>,
        upstream_pr_ids: Vec<u64>,
        upstream_authors: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        if upstream_pr_ids.is_empty() {
            return Err(Error::InvalidRecord(
                "a pending PR must reference at least one upstream PR".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            branch: branch.into(),
            upstream_pr_ids,
            upstream_authors: upstream_authors.into_iter().collect(),
            pr_id: None,
            created_at: now,
            updated_at: now,
            repo,
            upstream_repo,
            action: SyncAction::Pending,
        })
    }

    /// Attach the mirrored PR number
    #[must_use]
    pub const fn with_pr(mut self, pr_id: u64) -> Self {
        self.pr_id = Some(pr_id);
        self
    }

    /// Tracking issue number, set only once the record is blocked
    pub const fn github_issue(&self) -> Option<u64> {
        match self.action {
            SyncAction::Blocked { issue } => Some(issue),
            SyncAction::Pending | SyncAction::Merged => None,
        }
    }

    /// Whether this record pauses syncing for its branch
    pub const fn is_blocked(&self) -> bool {
        matches!(self.action, SyncAction::Blocked { .. })
    }

    /// Transition `Pending -> Merged`
    pub fn mark_merged(&mut self) -> Result<()> {
        self.transition(SyncAction::Merged)
    }

    /// Transition `Pending -> Blocked`
    pub fn mark_blocked(&mut self, issue: u64) -> Result<()> {
        self.transition(SyncAction::Blocked { issue })
    }

    fn transition(&mut self, next: SyncAction) -> Result<()> {
        if self.action.is_terminal() {
            return Err(Error::InvalidRecord(format!(
                "cannot move {}@{} from {} to {next}",
                self.repo, self.branch, self.action
            )));
        }
        self.action = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Upstream PR ids rendered as `#1, #2`
    pub fn upstream_pr_list(&self) -> String {
        format_pr_list(&self.upstream_pr_ids)
    }

    /// Upstream authors as an owned list
    pub fn assignees(&self) -> Vec<String> {
        self.upstream_authors.iter().cloned().collect()
    }
}

/// Render PR numbers as `#1, #2`
pub fn format_pr_list(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Host-facing types
// =============================================================================

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// PR details needed to gate and merge a mirrored PR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestDetails {
    /// PR number
    pub number: u64,
    /// PR body/description
    pub body: Option<String>,
    /// Current state of the PR
    pub state: PrState,
    /// Commit the PR head currently points at
    pub head_sha: String,
    /// Logins currently assigned
    pub assignees: Vec<String>,
}

/// Branch protection as far as merge gating cares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchProtection {
    /// Whether protection is enabled for the branch
    pub enabled: bool,
    /// Required status check contexts, `None` if no such policy exists.
    /// May contain duplicates as reported by the host.
    pub required_contexts: Option<Vec<String>>,
}

/// Raw file content with its transfer encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContent {
    /// Encoded content
    pub content: String,
    /// Encoding tag (e.g. `base64`), `None` for plain text
    pub encoding: Option<String>,
}

/// Result state of a single status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Passed (also neutral/skipped check runs)
    Success,
    /// Still running or queued
    Pending,
    /// Failed, errored, cancelled or timed out
    Failure,
}

/// A status check reported for a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStatus {
    /// Status context or check run name
    pub context: String,
    /// Current state
    pub state: CheckState,
}

/// Result of a merge operation
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Whether the merge was successful
    pub merged: bool,
    /// The SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the merge operation (especially on failure)
    pub message: Option<String>,
}

/// A new issue to open on the fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Issue title
    pub title: String,
    /// Issue body (markdown)
    pub body: String,
    /// Logins to assign
    pub assignees: Vec<String>,
}
