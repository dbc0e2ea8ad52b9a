//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use magic_mirror::error::{Error, Result};
use magic_mirror::platform::PlatformService;
use magic_mirror::types::{
    BranchProtection, CheckState, CheckStatus, MergeResult, NewIssue, PrState,
    PullRequestDetails, RepoContent, RepoRef,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `merge_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrCall {
    pub pr_number: u64,
    pub expected_head_sha: String,
}

/// Call record for `create_comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommentCall {
    pub number: u64,
    pub body: String,
}

/// Call record for `update_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrCall {
    pub pr_number: u64,
    pub body: String,
    pub assignees: Vec<String>,
}

/// Simple mock platform service for testing
///
/// Features:
/// - Auto-incrementing issue numbers
/// - Call tracking for verification
/// - Configurable responses per branch, path and PR
/// - Error injection for failure path testing
/// - Head moves to simulate pushes racing with evaluation
pub struct MockPlatformService {
    next_issue_number: AtomicU64,
    protection_responses: Mutex<HashMap<String, BranchProtection>>,
    content_responses: Mutex<HashMap<String, RepoContent>>,
    status_responses: Mutex<HashMap<String, Vec<CheckStatus>>>,
    approval_responses: Mutex<HashMap<u64, Vec<String>>>,
    pr_responses: Mutex<HashMap<u64, PullRequestDetails>>,
    merge_responses: Mutex<HashMap<u64, MergeResult>>,
    // Head sha the PR moves to right after it is read
    head_moves: Mutex<HashMap<u64, String>>,
    // Call tracking
    protection_calls: Mutex<Vec<String>>,
    content_calls: Mutex<Vec<(String, String)>>,
    status_calls: Mutex<Vec<String>>,
    get_pr_calls: Mutex<Vec<u64>>,
    merge_pr_calls: Mutex<Vec<MergePrCall>>,
    create_issue_calls: Mutex<Vec<NewIssue>>,
    create_comment_calls: Mutex<Vec<CreateCommentCall>>,
    update_pr_calls: Mutex<Vec<UpdatePrCall>>,
    // Error injection
    error_on_protection: Mutex<Option<String>>,
    error_on_content: Mutex<Option<String>>,
    error_on_merge_pr: Mutex<Option<Error>>,
    error_on_create_issue: Mutex<Option<String>>,
    error_on_create_comment: Mutex<Option<String>>,
}

impl Default for MockPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatformService {
    /// Create a mock with no configured responses
    pub fn new() -> Self {
        Self {
            next_issue_number: AtomicU64::new(500),
            protection_responses: Mutex::new(HashMap::new()),
            content_responses: Mutex::new(HashMap::new()),
            status_responses: Mutex::new(HashMap::new()),
            approval_responses: Mutex::new(HashMap::new()),
            pr_responses: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            head_moves: Mutex::new(HashMap::new()),
            protection_calls: Mutex::new(Vec::new()),
            content_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            get_pr_calls: Mutex::new(Vec::new()),
            merge_pr_calls: Mutex::new(Vec::new()),
            create_issue_calls: Mutex::new(Vec::new()),
            create_comment_calls: Mutex::new(Vec::new()),
            update_pr_calls: Mutex::new(Vec::new()),
            error_on_protection: Mutex::new(None),
            error_on_content: Mutex::new(None),
            error_on_merge_pr: Mutex::new(None),
            error_on_create_issue: Mutex::new(None),
            error_on_create_comment: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `branch_protection` return an error
    pub fn fail_protection(&self, msg: &str) {
        *self.error_on_protection.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `get_content` return an error
    pub fn fail_content(&self, msg: &str) {
        *self.error_on_content.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge_pr` return an error reported by the host
    pub fn fail_merge_pr(&self, msg: &str) {
        *self.error_on_merge_pr.lock().unwrap() = Some(Error::GitHubApi(msg.to_string()));
    }

    /// Make `merge_pr` fail before reaching the host
    pub fn fail_merge_pr_transport(&self, msg: &str) {
        *self.error_on_merge_pr.lock().unwrap() = Some(Error::Transport(msg.to_string()));
    }

    /// Make `create_issue` return an error
    pub fn fail_create_issue(&self, msg: &str) {
        *self.error_on_create_issue.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_comment` return an error
    pub fn fail_create_comment(&self, msg: &str) {
        *self.error_on_create_comment.lock().unwrap() = Some(msg.to_string());
    }

    // === Response setup ===

    /// Set the protection of a branch
    pub fn set_protection(&self, branch: &str, protection: BranchProtection) {
        self.protection_responses
            .lock()
            .unwrap()
            .insert(branch.to_string(), protection);
    }

    /// Protect a branch with required check contexts
    pub fn require_checks(&self, branch: &str, contexts: &[&str]) {
        self.set_protection(
            branch,
            BranchProtection {
                enabled: true,
                required_contexts: Some(contexts.iter().map(ToString::to_string).collect()),
            },
        );
    }

    /// Set file content at `path` (any ref)
    pub fn set_content(&self, path: &str, content: RepoContent) {
        self.content_responses
            .lock()
            .unwrap()
            .insert(path.to_string(), content);
    }

    /// Set plain-text file content at `path`
    pub fn set_text_content(&self, path: &str, text: &str) {
        self.set_content(
            path,
            RepoContent {
                content: text.to_string(),
                encoding: None,
            },
        );
    }

    /// Set the check statuses of a commit
    pub fn set_statuses(&self, sha: &str, statuses: &[(&str, CheckState)]) {
        self.status_responses.lock().unwrap().insert(
            sha.to_string(),
            statuses
                .iter()
                .map(|(context, state)| CheckStatus {
                    context: (*context).to_string(),
                    state: *state,
                })
                .collect(),
        );
    }

    /// Set approving reviewers of a PR
    pub fn set_approvals(&self, pr_number: u64, logins: &[&str]) {
        self.approval_responses
            .lock()
            .unwrap()
            .insert(pr_number, logins.iter().map(ToString::to_string).collect());
    }

    /// Set the details returned for a PR
    pub fn set_pr(&self, details: PullRequestDetails) {
        self.pr_responses
            .lock()
            .unwrap()
            .insert(details.number, details);
    }

    /// Set the response for `merge_pr` for a specific PR
    pub fn set_merge_response(&self, pr_number: u64, result: MergeResult) {
        self.merge_responses
            .lock()
            .unwrap()
            .insert(pr_number, result);
    }

    /// Move the PR head to `sha` as soon as its details have been read
    pub fn move_head_after_read(&self, pr_number: u64, sha: &str) {
        self.head_moves
            .lock()
            .unwrap()
            .insert(pr_number, sha.to_string());
    }

    /// Set up an open PR whose head passes the given checks and merges cleanly
    pub fn setup_mergeable_pr(&self, pr_number: u64, head_sha: &str) {
        self.set_pr(make_pr(pr_number, head_sha));
        self.set_merge_response(
            pr_number,
            MergeResult {
                merged: true,
                sha: Some(format!("merged_sha_{pr_number}")),
                message: None,
            },
        );
    }

    // === Call verification methods ===

    pub fn get_protection_calls(&self) -> Vec<String> {
        self.protection_calls.lock().unwrap().clone()
    }

    pub fn get_content_calls(&self) -> Vec<(String, String)> {
        self.content_calls.lock().unwrap().clone()
    }

    pub fn get_status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn get_pr_calls(&self) -> Vec<u64> {
        self.get_pr_calls.lock().unwrap().clone()
    }

    pub fn get_merge_pr_calls(&self) -> Vec<MergePrCall> {
        self.merge_pr_calls.lock().unwrap().clone()
    }

    pub fn get_create_issue_calls(&self) -> Vec<NewIssue> {
        self.create_issue_calls.lock().unwrap().clone()
    }

    pub fn get_create_comment_calls(&self) -> Vec<CreateCommentCall> {
        self.create_comment_calls.lock().unwrap().clone()
    }

    pub fn get_update_pr_calls(&self) -> Vec<UpdatePrCall> {
        self.update_pr_calls.lock().unwrap().clone()
    }

    /// Get count of `merge_pr` calls
    pub fn merge_call_count(&self) -> usize {
        self.merge_pr_calls.lock().unwrap().len()
    }

    /// Assert that `merge_pr` was NOT called for a specific PR
    pub fn assert_merge_not_called(&self, pr_number: u64) {
        let calls = self.get_merge_pr_calls();
        assert!(
            !calls.iter().any(|c| c.pr_number == pr_number),
            "Expected merge_pr({pr_number}) NOT to be called but it was: {calls:?}"
        );
    }

    /// Assert that no issue was opened
    pub fn assert_no_issue_created(&self) {
        let calls = self.get_create_issue_calls();
        assert!(calls.is_empty(), "Expected no issue but got: {calls:?}");
    }
}

/// Open PR with a body and no assignees
pub fn make_pr(number: u64, head_sha: &str) -> PullRequestDetails {
    PullRequestDetails {
        number,
        body: Some("Mirrors upstream changes.".to_string()),
        state: PrState::Open,
        head_sha: head_sha.to_string(),
        assignees: vec![],
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn branch_protection(&self, _repo: &RepoRef, branch: &str) -> Result<BranchProtection> {
        self.protection_calls
            .lock()
            .unwrap()
            .push(branch.to_string());

        if let Some(msg) = self.error_on_protection.lock().unwrap().as_ref() {
            return Err(Error::Lookup(msg.clone()));
        }

        let responses = self.protection_responses.lock().unwrap();
        Ok(responses.get(branch).cloned().unwrap_or_default())
    }

    async fn get_content(
        &self,
        _repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RepoContent>> {
        self.content_calls
            .lock()
            .unwrap()
            .push((path.to_string(), git_ref.to_string()));

        if let Some(msg) = self.error_on_content.lock().unwrap().as_ref() {
            return Err(Error::Lookup(msg.clone()));
        }

        let responses = self.content_responses.lock().unwrap();
        Ok(responses.get(path).cloned())
    }

    async fn commit_statuses(&self, _repo: &RepoRef, sha: &str) -> Result<Vec<CheckStatus>> {
        self.status_calls.lock().unwrap().push(sha.to_string());
        let responses = self.status_responses.lock().unwrap();
        Ok(responses.get(sha).cloned().unwrap_or_default())
    }

    async fn pr_approvals(&self, _repo: &RepoRef, pr_number: u64) -> Result<Vec<String>> {
        let responses = self.approval_responses.lock().unwrap();
        Ok(responses.get(&pr_number).cloned().unwrap_or_default())
    }

    async fn get_pr(&self, _repo: &RepoRef, pr_number: u64) -> Result<PullRequestDetails> {
        self.get_pr_calls.lock().unwrap().push(pr_number);

        let mut responses = self.pr_responses.lock().unwrap();
        let details = responses.get(&pr_number).cloned().ok_or_else(|| {
            Error::GitHubApi(format!("get_pr: no response configured for PR #{pr_number}"))
        })?;

        // Simulate a push landing right after evaluation read the PR
        if let Some(sha) = self.head_moves.lock().unwrap().remove(&pr_number)
            && let Some(stored) = responses.get_mut(&pr_number)
        {
            stored.head_sha = sha;
        }
        Ok(details)
    }

    async fn merge_pr(
        &self,
        _repo: &RepoRef,
        pr_number: u64,
        expected_head_sha: &str,
    ) -> Result<MergeResult> {
        self.merge_pr_calls.lock().unwrap().push(MergePrCall {
            pr_number,
            expected_head_sha: expected_head_sha.to_string(),
        });

        if let Some(err) = self.error_on_merge_pr.lock().unwrap().as_ref() {
            return Err(match err {
                Error::Transport(msg) => Error::Transport(msg.clone()),
                Error::GitHubApi(msg) => Error::GitHubApi(msg.clone()),
                other => Error::GitHubApi(other.to_string()),
            });
        }

        // Enforce the head precondition like GitHub does (409)
        if let Some(pr) = self.pr_responses.lock().unwrap().get(&pr_number)
            && pr.head_sha != expected_head_sha
        {
            return Err(Error::GitHubApi(format!(
                "Merge failed: Head branch was modified. Review and try the merge again. (expected {expected_head_sha}, head is {})",
                pr.head_sha
            )));
        }

        let responses = self.merge_responses.lock().unwrap();
        responses.get(&pr_number).cloned().ok_or_else(|| {
            Error::GitHubApi(format!(
                "merge_pr: no response configured for PR #{pr_number}"
            ))
        })
    }

    async fn create_issue(&self, _repo: &RepoRef, issue: &NewIssue) -> Result<u64> {
        self.create_issue_calls.lock().unwrap().push(issue.clone());

        if let Some(msg) = self.error_on_create_issue.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }

        Ok(self.next_issue_number.fetch_add(1, Ordering::SeqCst))
    }

    async fn create_comment(&self, _repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        self.create_comment_calls
            .lock()
            .unwrap()
            .push(CreateCommentCall {
                number,
                body: body.to_string(),
            });

        if let Some(msg) = self.error_on_create_comment.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }
        Ok(())
    }

    async fn update_pr(
        &self,
        _repo: &RepoRef,
        pr_number: u64,
        body: &str,
        assignees: &[String],
    ) -> Result<()> {
        self.update_pr_calls.lock().unwrap().push(UpdatePrCall {
            pr_number,
            body: body.to_string(),
            assignees: assignees.to_vec(),
        });
        Ok(())
    }
}
