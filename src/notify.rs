//! Best-effort notifications on PRs and issues
//!
//! Errors are returned for the caller to log or ignore; they never abort
//! a sync cycle on their own.

use crate::error::Result;
use crate::platform::PlatformService;
use crate::types::RepoRef;
use tracing::debug;

/// Comment on an issue or PR
pub async fn comment(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    number: u64,
    message: &str,
) -> Result<()> {
    platform.create_comment(repo, number, message).await
}

/// Append `message` to a PR description
///
/// Existing assignees are kept; `default_assignees` apply only when the PR
/// has none. A PR without a body is left untouched.
pub async fn update_pr(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    pr_number: u64,
    default_assignees: &[String],
    message: &str,
) -> Result<()> {
    let pr = platform.get_pr(repo, pr_number).await?;

    let Some(body) = pr.body.filter(|b| !b.trim().is_empty()) else {
        debug!(%repo, pr_number, "PR has no body, nothing to update");
        return Ok(());
    };

    let assignees = if pr.assignees.is_empty() {
        default_assignees.to_vec()
    } else {
        pr.assignees
    };

    let updated = format!("{body}\n\n{message}");
    platform
        .update_pr(repo, pr_number, &updated, &assignees)
        .await
}
