//! Merge gating - required status checks and owner approval
//!
//! The lookups here are read-only and can be repeated freely before a
//! merge attempt. Lookup failures are returned as errors and never
//! collapse into a default gate state.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{CheckState, PrState, PullRequestDetails, RepoContent, RepoRef};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Default location of the ownership file at the branch tip
pub const OWNERS_FILE: &str = "OWNERS";

/// Gating policy applied on top of branch protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    /// Require an approving review from someone listed in the OWNERS file
    pub require_owner_approval: bool,
    /// Path of the ownership file
    pub owners_file: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            require_owner_approval: false,
            owners_file: OWNERS_FILE.to_string(),
        }
    }
}

/// Required status check contexts for a branch
///
/// Empty when protection is disabled or no status check policy exists.
pub async fn required_checks(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    branch: &str,
) -> Result<BTreeSet<String>> {
    let protection = platform.branch_protection(repo, branch).await?;
    if !protection.enabled {
        return Ok(BTreeSet::new());
    }
    Ok(protection
        .required_contexts
        .unwrap_or_default()
        .into_iter()
        .collect())
}

/// Approvers listed in the default OWNERS file of a branch
pub async fn approvers(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    branch: &str,
) -> Result<Vec<String>> {
    approvers_at(platform, repo, branch, OWNERS_FILE).await
}

/// Approvers listed in the ownership file at `path`
///
/// A missing file yields an empty list. A file that cannot be fetched or
/// decoded is an error.
pub async fn approvers_at(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    branch: &str,
    path: &str,
) -> Result<Vec<String>> {
    let Some(content) = platform.get_content(repo, path, branch).await? else {
        debug!(%repo, branch, path, "no ownership file");
        return Ok(Vec::new());
    };
    let text = decode_content(&content)?;
    Ok(parse_owners(&text))
}

/// Decode a content envelope into UTF-8 text
pub fn decode_content(content: &RepoContent) -> Result<String> {
    let bytes = match content.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps base64 payloads at 60 columns
            let compact: String = content
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact)
                .map_err(|e| Error::ContentDecode(format!("invalid base64: {e}")))?
        }
        None | Some("" | "utf-8" | "utf8") => content.content.clone().into_bytes(),
        Some(other) => {
            return Err(Error::ContentDecode(format!(
                "unsupported encoding '{other}'"
            )));
        }
    };
    String::from_utf8(bytes).map_err(|e| Error::ContentDecode(format!("not UTF-8: {e}")))
}

/// Extract the `approvers` list from an ownership document
///
/// Any shape other than a mapping with a list under `approvers` yields an
/// empty list. Non-string entries are skipped.
pub fn parse_owners(text: &str) -> Vec<String> {
    #[derive(Deserialize)]
    struct Owners {
        approvers: Option<Vec<serde_yaml::Value>>,
    }

    match serde_yaml::from_str::<Owners>(text) {
        Ok(Owners {
            approvers: Some(list),
        }) => list
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "ownership file is not a mapping with approvers");
            Vec::new()
        }
    }
}

/// Gate evaluation result for one PR head
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateReport {
    /// Head commit the report was computed for
    pub head_sha: String,
    /// Required checks not yet reported or still running
    pub pending_checks: Vec<String>,
    /// Required checks that failed
    pub failing_checks: Vec<String>,
    /// Whether the owner approval requirement is met
    pub approved: bool,
    /// Human-readable reasons the PR cannot be merged yet
    pub blocking_reasons: Vec<String>,
}

impl GateReport {
    /// Whether all gates pass
    pub fn is_ready(&self) -> bool {
        self.blocking_reasons.is_empty()
    }
}

/// Evaluate whether a mirrored PR's current head may be merged
pub async fn evaluate(
    platform: &dyn PlatformService,
    repo: &RepoRef,
    branch: &str,
    pr: &PullRequestDetails,
    policy: &GatePolicy,
) -> Result<GateReport> {
    debug!(%repo, branch, pr_number = pr.number, head = %pr.head_sha, "evaluating gates");
    let mut report = GateReport {
        head_sha: pr.head_sha.clone(),
        approved: true,
        ..GateReport::default()
    };

    if pr.state != PrState::Open {
        report
            .blocking_reasons
            .push(format!("PR #{} is {}", pr.number, pr.state));
        return Ok(report);
    }

    let required = required_checks(platform, repo, branch).await?;
    if !required.is_empty() {
        let statuses = platform.commit_statuses(repo, &pr.head_sha).await?;
        let mut states: HashMap<&str, CheckState> = HashMap::new();
        for status in &statuses {
            // A failure anywhere wins over pending, pending over success
            let entry = states.entry(&status.context).or_insert(status.state);
            *entry = worst(*entry, status.state);
        }
        for context in &required {
            match states.get(context.as_str()) {
                Some(CheckState::Success) => {}
                Some(CheckState::Failure) => report.failing_checks.push(context.clone()),
                Some(CheckState::Pending) | None => report.pending_checks.push(context.clone()),
            }
        }
    }
    if !report.failing_checks.is_empty() {
        report.blocking_reasons.push(format!(
            "Required checks failing: {}",
            report.failing_checks.join(", ")
        ));
    }
    if !report.pending_checks.is_empty() {
        report.blocking_reasons.push(format!(
            "Required checks pending: {}",
            report.pending_checks.join(", ")
        ));
    }

    if policy.require_owner_approval {
        let owners = approvers_at(platform, repo, branch, &policy.owners_file).await?;
        if !owners.is_empty() {
            let approvals = platform.pr_approvals(repo, pr.number).await?;
            // GitHub logins are case-insensitive
            report.approved = approvals
                .iter()
                .any(|login| owners.iter().any(|owner| owner.eq_ignore_ascii_case(login)));
            if !report.approved {
                report
                    .blocking_reasons
                    .push("Not approved by an owner".to_string());
            }
        }
    }

    debug!(
        pr_number = pr.number,
        ready = report.is_ready(),
        reasons = ?report.blocking_reasons,
        "evaluated gates"
    );
    Ok(report)
}

const fn worst(a: CheckState, b: CheckState) -> CheckState {
    match (a, b) {
        (CheckState::Failure, _) | (_, CheckState::Failure) => CheckState::Failure,
        (CheckState::Pending, _) | (_, CheckState::Pending) => CheckState::Pending,
        (CheckState::Success, CheckState::Success) => CheckState::Success,
    }
}
