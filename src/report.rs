//! Failure reporting - tracking issues that pause a branch
//!
//! A report only creates the issue. Persisting `Blocked` with the returned
//! issue number is the caller's job; without it the branch is retried on
//! the next cycle and the issue is duplicated.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{NewIssue, PendingPr, RepoRef, format_pr_list};
use std::fmt::Write as _;
use tracing::info;

/// Everything needed to render and file a tracking issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Fork the issue is opened on
    pub repo: RepoRef,
    /// Upstream source of the mirrored PRs
    pub upstream_repo: RepoRef,
    /// Branch whose syncing is paused
    pub branch: String,
    /// Upstream PRs that failed to sync
    pub upstream_pr_ids: Vec<u64>,
    /// Short cause of the failure
    pub reason: String,
    /// Mirrored PR on the fork, if one was opened
    pub pr_id: Option<u64>,
    /// Issue assignees
    pub assignees: Vec<String>,
    /// Commands to recreate the intended change by hand
    pub recreate_commands: Option<String>,
    /// Raw error output, quoted verbatim
    pub error_detail: Option<String>,
}

impl FailureReport {
    /// Build a report for a pending record, assigned to its upstream authors
    pub fn for_record(record: &PendingPr, reason: impl Into<String>) -> Self {
        Self {
            repo: record.repo.clone(),
            upstream_repo: record.upstream_repo.clone(),
            branch: record.branch.clone(),
            upstream_pr_ids: record.upstream_pr_ids.clone(),
            reason: reason.into(),
            pr_id: record.pr_id,
            assignees: record.assignees(),
            recreate_commands: None,
            error_detail: None,
        }
    }

    /// Attach raw error output
    #[must_use]
    pub fn with_error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    /// Attach manual recreation commands
    #[must_use]
    pub fn with_recreate_commands(mut self, commands: impl Into<String>) -> Self {
        self.recreate_commands = Some(commands.into());
        self
    }

    /// Issue title listing the failed upstream PRs
    pub fn title(&self) -> String {
        format!(
            "Failed to sync upstream PRs {}",
            format_pr_list(&self.upstream_pr_ids)
        )
    }

    /// Issue body
    pub fn body(&self) -> String {
        let mut body = String::new();
        let upstream = self
            .upstream_pr_ids
            .iter()
            .map(|id| format!("{}#{id}", self.upstream_repo))
            .collect::<Vec<_>>()
            .join(", ");

        let _ = writeln!(body, "Syncing {upstream} into `{}` failed.", self.branch);
        let _ = writeln!(body);
        let _ = writeln!(body, "**Reason:** {}", self.reason);
        let _ = writeln!(body);
        if let Some(pr) = self.pr_id {
            let _ = writeln!(body, "Mirrored pull request: #{pr}");
            let _ = writeln!(body);
        }
        let _ = writeln!(body, "{}", paused_notice(&self.branch));

        if let Some(ref detail) = self.error_detail {
            let _ = writeln!(body);
            let _ = writeln!(body, "Error output:");
            let _ = writeln!(body);
            push_fenced(&mut body, detail, "");
        }

        if let Some(ref commands) = self.recreate_commands {
            let _ = writeln!(body);
            let _ = writeln!(body, "To recreate the change manually:");
            let _ = writeln!(body);
            push_fenced(&mut body, commands, "sh");
        }

        body
    }

    /// The issue as it will be submitted
    pub fn to_issue(&self) -> NewIssue {
        NewIssue {
            title: self.title(),
            body: self.body(),
            assignees: self.assignees.clone(),
        }
    }
}

/// Sentence stating that syncing of `branch` is paused
pub fn paused_notice(branch: &str) -> String {
    format!("Syncing is paused for branch `{branch}` until this issue is closed.")
}

/// Wrap `text` in a code fence longer than any backtick run inside it
fn push_fenced(out: &mut String, text: &str, lang: &str) {
    let longest_run = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let _ = writeln!(out, "{fence}{lang}");
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{fence}");
}

/// Open the tracking issue for a failure, returning its number
///
/// Failure to create the issue is propagated; there is no fallback channel.
pub async fn report_failure(platform: &dyn PlatformService, report: &FailureReport) -> Result<u64> {
    let issue = report.to_issue();
    let number = platform
        .create_issue(&report.repo, &issue)
        .await
        .map_err(|e| Error::Report(e.to_string()))?;

    info!(
        repo = %report.repo,
        branch = %report.branch,
        issue = number,
        upstream = ?report.upstream_pr_ids,
        "opened tracking issue, branch paused"
    );
    Ok(number)
}
