//! Merge execution - effectful operations
//!
//! Performs a single rebase merge constrained to the head commit the
//! caller evaluated, so a push racing with evaluation makes the host
//! reject the merge instead of merging unreviewed content.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::PendingPr;
use tracing::{debug, info, warn};

/// Outcome of a merge attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The host merged the PR
    Merged {
        /// Resulting commit, if reported
        sha: Option<String>,
    },
    /// The host refused or failed the merge
    Failed {
        /// Host-reported reason
        message: String,
    },
}

impl MergeOutcome {
    /// Check if the merge succeeded
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// Attempt to merge the mirrored PR of `record` at `expected_head`
///
/// Any failure the host reports (conflict, stale head, closed PR,
/// permissions) becomes `MergeOutcome::Failed`. A record without a
/// mirrored PR is an error, and so is a request that never reached the
/// host (`Error::Transport`); the record stays `Pending` for the next cycle.
pub async fn attempt_merge(
    platform: &dyn PlatformService,
    record: &PendingPr,
    expected_head: &str,
) -> Result<MergeOutcome> {
    let pr_number = record.pr_id.ok_or_else(|| {
        Error::InvalidRecord(format!(
            "no mirrored PR to merge for {} on {}",
            record.upstream_pr_list(),
            record.branch
        ))
    })?;

    debug!(repo = %record.repo, pr_number, expected_head, "attempting merge");

    let outcome = match platform
        .merge_pr(&record.repo, pr_number, expected_head)
        .await
    {
        Ok(result) if result.merged => MergeOutcome::Merged { sha: result.sha },
        Ok(result) => MergeOutcome::Failed {
            // Merge API returned but didn't merge
            message: result
                .message
                .unwrap_or_else(|| "merge was not performed".to_string()),
        },
        Err(Error::Transport(msg)) => {
            warn!(
                repo = %record.repo,
                pr_number,
                error = %msg,
                "merge request did not reach GitHub"
            );
            return Err(Error::Transport(msg));
        }
        Err(e) => MergeOutcome::Failed {
            message: e.to_string(),
        },
    };

    match &outcome {
        MergeOutcome::Merged { sha } => {
            info!(repo = %record.repo, pr_number, sha = ?sha, "merged mirrored PR");
        }
        MergeOutcome::Failed { message } => {
            info!(repo = %record.repo, pr_number, %message, "merge rejected");
        }
    }
    Ok(outcome)
}
