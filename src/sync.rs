//! One evaluation cycle for a fork branch
//!
//! Load the record, gate it, merge at most once, and either persist
//! `Merged` or report the failure and persist `Blocked`. Callers must not
//! run two cycles for the same `(repo, branch)` concurrently.

use crate::error::{Error, Result};
use crate::gate::{self, GatePolicy};
use crate::merge::{MergeOutcome, attempt_merge};
use crate::notify;
use crate::platform::PlatformService;
use crate::report::{FailureReport, paused_notice, report_failure};
use crate::store::Store;
use crate::types::{PendingPr, PrState, RepoRef, SyncAction};
use tracing::{debug, info, warn};

/// Reason recorded when mirroring could not open a PR
pub const MISSING_PR_REASON: &str = "the mirrored pull request could not be created";

/// Reason recorded when the mirrored PR was closed without merging
pub const CLOSED_PR_REASON: &str = "the mirrored pull request was closed without being merged";

/// Reason recorded when the host rejects the merge
pub const MERGE_FAILED_REASON: &str = "the mirrored pull request could not be merged";

/// What a cycle did for a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing pending for the branch
    Idle,
    /// Branch is paused by an open tracking issue
    Paused {
        /// Tracking issue number
        issue: u64,
    },
    /// Gates not satisfied yet; the record is unchanged
    Waiting {
        /// Why the PR cannot be merged yet
        reasons: Vec<String>,
    },
    /// The mirrored PR was merged
    Merged {
        /// Mirrored PR number
        pr_number: u64,
        /// Resulting commit, if reported
        sha: Option<String>,
    },
    /// The cycle failed and the branch is now paused
    Blocked {
        /// Newly opened tracking issue
        issue: u64,
    },
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "nothing to do"),
            Self::Paused { issue } => write!(f, "paused by #{issue}"),
            Self::Waiting { reasons } => write!(f, "waiting: {}", reasons.join(", ")),
            Self::Merged { pr_number, .. } => write!(f, "merged #{pr_number}"),
            Self::Blocked { issue } => write!(f, "blocked, opened #{issue}"),
        }
    }
}

/// Run one evaluation cycle for `branch` of the fork `repo`
///
/// A pending record that mirrors a different upstream than `upstream` is
/// rejected before any host call.
pub async fn evaluate_branch(
    platform: &dyn PlatformService,
    store: &dyn Store,
    repo: &RepoRef,
    upstream: &RepoRef,
    branch: &str,
    policy: &GatePolicy,
) -> Result<CycleOutcome> {
    let Some(mut record) = store.get(repo, branch)? else {
        debug!(%repo, branch, "no pending PR");
        return Ok(CycleOutcome::Idle);
    };

    match record.action {
        SyncAction::Merged => return Ok(CycleOutcome::Idle),
        SyncAction::Blocked { issue } => {
            debug!(%repo, branch, issue, "branch paused");
            return Ok(CycleOutcome::Paused { issue });
        }
        SyncAction::Pending => {}
    }

    if record.upstream_repo != *upstream {
        return Err(Error::InvalidRecord(format!(
            "record for {repo} {branch} mirrors {}, expected {upstream}",
            record.upstream_repo
        )));
    }

    let Some(pr_number) = record.pr_id else {
        let report = FailureReport::for_record(&record, MISSING_PR_REASON);
        let issue = block(platform, store, &mut record, &report).await?;
        return Ok(CycleOutcome::Blocked { issue });
    };

    let pr = platform.get_pr(repo, pr_number).await?;
    match pr.state {
        PrState::Open => {}
        PrState::Merged => {
            // Merged by hand since the last cycle
            record.mark_merged()?;
            store.put(&record)?;
            info!(%repo, branch, pr_number, "mirrored PR already merged");
            return Ok(CycleOutcome::Merged {
                pr_number,
                sha: None,
            });
        }
        PrState::Closed => {
            let report = FailureReport::for_record(&record, CLOSED_PR_REASON);
            let issue = block(platform, store, &mut record, &report).await?;
            return Ok(CycleOutcome::Blocked { issue });
        }
    }

    let gates = gate::evaluate(platform, repo, branch, &pr, policy).await?;
    if !gates.is_ready() {
        debug!(%repo, branch, pr_number, reasons = ?gates.blocking_reasons, "not mergeable yet");
        return Ok(CycleOutcome::Waiting {
            reasons: gates.blocking_reasons,
        });
    }

    match attempt_merge(platform, &record, &gates.head_sha).await? {
        MergeOutcome::Merged { sha } => {
            record.mark_merged()?;
            store.put(&record)?;
            info!(
                %repo,
                branch,
                pr_number,
                upstream = %record.upstream_pr_list(),
                "mirrored PR merged"
            );
            Ok(CycleOutcome::Merged { pr_number, sha })
        }
        MergeOutcome::Failed { message } => {
            let report =
                FailureReport::for_record(&record, MERGE_FAILED_REASON).with_error_detail(message);
            let issue = block(platform, store, &mut record, &report).await?;

            let note = format!("Merging failed, see #{issue}. {}", paused_notice(branch));
            if let Err(e) = notify::comment(platform, repo, pr_number, &note).await {
                warn!(%repo, pr_number, error = %e, "failed to comment on mirrored PR");
            }
            Ok(CycleOutcome::Blocked { issue })
        }
    }
}

/// Open the tracking issue and persist the blocked state
///
/// If the issue cannot be created the record stays `Pending` and the error
/// propagates, so the next cycle retries the report.
async fn block(
    platform: &dyn PlatformService,
    store: &dyn Store,
    record: &mut PendingPr,
    report: &FailureReport,
) -> Result<u64> {
    let issue = report_failure(platform, report).await?;
    record.mark_blocked(issue)?;
    store.put(record)?;
    Ok(issue)
}
