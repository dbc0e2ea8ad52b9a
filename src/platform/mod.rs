//! Platform service for the source-control host
//!
//! Provides the operations the sync engine needs from GitHub: branch
//! protection and content reads, status checks, and PR/issue writes.

mod github;

pub use github::GitHubService;

use crate::error::Result;
use crate::types::{
    BranchProtection, CheckStatus, MergeResult, NewIssue, PullRequestDetails,
    RepoContent, RepoRef,
};
use async_trait::async_trait;

/// Platform service trait for host operations
///
/// The authenticated client lives behind this trait and is passed into every
/// engine operation, so tests can substitute a recording implementation.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Read the protection settings of a branch
    async fn branch_protection(&self, repo: &RepoRef, branch: &str) -> Result<BranchProtection>;

    /// Read a file at a git ref
    ///
    /// Returns `Ok(None)` when the file does not exist. Any other failure
    /// (network, auth, server error) is an error.
    async fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RepoContent>>;

    /// List status checks and check runs reported for a commit
    async fn commit_statuses(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckStatus>>;

    /// Logins that left an approving review on a PR
    async fn pr_approvals(&self, repo: &RepoRef, pr_number: u64) -> Result<Vec<String>>;

    /// Get PR details including head commit and assignees
    async fn get_pr(&self, repo: &RepoRef, pr_number: u64) -> Result<PullRequestDetails>;

    /// Rebase-merge a PR, only if its head is still `expected_head_sha`
    ///
    /// Host-side rejections surface either as `Error::GitHubApi` or as a
    /// `MergeResult` with `merged == false`. `Error::Transport` means the
    /// host never answered.
    async fn merge_pr(
        &self,
        repo: &RepoRef,
        pr_number: u64,
        expected_head_sha: &str,
    ) -> Result<MergeResult>;

    /// Open an issue, returning its number
    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<u64>;

    /// Comment on an issue or PR
    async fn create_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()>;

    /// Replace a PR's body and assignees
    async fn update_pr(
        &self,
        repo: &RepoRef,
        pr_number: u64,
        body: &str,
        assignees: &[String],
    ) -> Result<()>;
}
