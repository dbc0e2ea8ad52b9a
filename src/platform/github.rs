//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    BranchProtection, CheckState, CheckStatus, MergeResult, NewIssue, PrState,
    PullRequestDetails, RepoContent, RepoRef,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::models::pulls::ReviewState;
use octocrab::params::pulls::MergeMethod;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.github.com";

// REST payloads read through the raw HTTP client

#[derive(Deserialize)]
struct BranchPayload {
    #[serde(default)]
    protected: bool,
    protection: Option<ProtectionPayload>,
}

#[derive(Deserialize)]
struct ProtectionPayload {
    enabled: Option<bool>,
    required_status_checks: Option<RequiredChecksPayload>,
}

#[derive(Deserialize)]
struct RequiredChecksPayload {
    enforcement_level: Option<String>,
    #[serde(default)]
    contexts: Vec<String>,
    #[serde(default)]
    checks: Vec<RequiredCheckPayload>,
}

#[derive(Deserialize)]
struct RequiredCheckPayload {
    context: String,
}

#[derive(Deserialize)]
struct ContentPayload {
    content: Option<String>,
    encoding: Option<String>,
}

impl From<BranchPayload> for BranchProtection {
    fn from(branch: BranchPayload) -> Self {
        let Some(protection) = branch.protection else {
            return Self {
                enabled: branch.protected,
                required_contexts: None,
            };
        };

        let enabled = protection.enabled.unwrap_or(branch.protected);
        let required_contexts = protection
            .required_status_checks
            .filter(|checks| checks.enforcement_level.as_deref() != Some("off"))
            .map(|checks| {
                checks
                    .contexts
                    .into_iter()
                    .chain(checks.checks.into_iter().map(|c| c.context))
                    .collect()
            });

        Self {
            enabled,
            required_contexts,
        }
    }
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    /// Token for raw HTTP requests (branch, contents and status endpoints)
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API base URL for raw requests, without trailing slash
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// `host` selects a GitHub Enterprise instance; `None` targets github.com.
    pub fn new(token: &str, host: Option<&str>) -> Result<Self> {
        let api_base = host.map_or_else(
            || DEFAULT_API_BASE.to_string(),
            |h| format!("https://{h}/api/v3"),
        );
        Self::with_base_url(token, &api_base)
    }

    /// Create a service against an explicit API base URL
    pub fn with_base_url(token: &str, api_base: &str) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if api_base != DEFAULT_API_BASE {
            builder = builder
                .base_uri(api_base.as_str())
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }
        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("magic-mirror")
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    fn repo_url(&self, repo: &RepoRef, rest: &str) -> String {
        format!(
            "{}/repos/{}/{}/{rest}",
            self.api_base,
            urlencoding::encode(&repo.organization),
            urlencoding::encode(&repo.name)
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`
    async fn get_all_pages<P, T>(
        &self,
        first_url: String,
        what: &str,
        mut items: impl FnMut(P) -> Vec<T>,
    ) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut all = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let response = self
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Lookup(format!("Failed to fetch {what}: {e}")))?;

            if !response.status().is_success() {
                return Err(Error::Lookup(format!(
                    "{what} returned {}",
                    response.status()
                )));
            }

            next = next_page_url(response.headers());
            let page: P = response
                .json()
                .await
                .map_err(|e| Error::Lookup(format!("Failed to parse {what}: {e}")))?;
            all.extend(items(page));
        }
        Ok(all)
    }

    /// Legacy commit statuses via combined status API
    async fn legacy_statuses(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckStatus>> {
        #[derive(Deserialize)]
        struct CombinedStatus {
            #[serde(default)]
            statuses: Vec<Status>,
        }

        #[derive(Deserialize)]
        struct Status {
            context: String,
            state: String,
        }

        let url = self.repo_url(repo, &format!("commits/{sha}/status?per_page=100"));
        self.get_all_pages(url, &format!("commit status for {sha}"), |page: CombinedStatus| {
            page.statuses
                .into_iter()
                .map(|s| CheckStatus {
                    state: match s.state.as_str() {
                        "success" => CheckState::Success,
                        "pending" => CheckState::Pending,
                        _ => CheckState::Failure,
                    },
                    context: s.context,
                })
                .collect()
        })
        .await
    }

    /// GitHub Actions check runs
    async fn check_runs(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckStatus>> {
        #[derive(Deserialize)]
        struct CheckRunsResponse {
            #[serde(default)]
            check_runs: Vec<CheckRun>,
        }

        #[derive(Deserialize)]
        struct CheckRun {
            name: String,
            status: String,
            conclusion: Option<String>,
        }

        let url = self.repo_url(repo, &format!("commits/{sha}/check-runs?per_page=100"));
        self.get_all_pages(url, &format!("check runs for {sha}"), |page: CheckRunsResponse| {
            page.check_runs
                .into_iter()
                .map(|run| {
                    let state = if run.status == "completed" {
                        match run.conclusion.as_deref() {
                            Some("success" | "neutral" | "skipped") => CheckState::Success,
                            // Completed without a conclusion counts as failed
                            _ => CheckState::Failure,
                        }
                    } else {
                        CheckState::Pending
                    };
                    CheckStatus {
                        context: run.name,
                        state,
                    }
                })
                .collect()
        })
        .await
    }
}

/// Target of the `rel="next"` entry of a `Link` header
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == r#"rel="next""#)
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

/// Reviewers whose latest verdict is an approval
///
/// Reviews are in submission order. Comments leave an earlier verdict
/// standing; a change request or dismissal withdraws an approval.
fn latest_approvers(reviews: impl IntoIterator<Item = (String, ReviewState)>) -> Vec<String> {
    let mut verdicts: BTreeMap<String, (String, bool)> = BTreeMap::new();
    for (login, state) in reviews {
        let approved = match state {
            ReviewState::Approved => true,
            ReviewState::ChangesRequested | ReviewState::Dismissed => false,
            _ => continue,
        };
        verdicts.insert(login.to_ascii_lowercase(), (login, approved));
    }
    verdicts
        .into_values()
        .filter_map(|(login, approved)| approved.then_some(login))
        .collect()
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn branch_protection(&self, repo: &RepoRef, branch: &str) -> Result<BranchProtection> {
        debug!(%repo, branch, "reading branch protection");
        let url = self.repo_url(repo, &format!("branches/{}", urlencoding::encode(branch)));

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Lookup(format!("Failed to fetch branch {branch}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Lookup(format!(
                "branch {branch} of {repo} returned {}",
                response.status()
            )));
        }

        let payload: BranchPayload = response
            .json()
            .await
            .map_err(|e| Error::Lookup(format!("Failed to parse branch {branch}: {e}")))?;

        let protection = BranchProtection::from(payload);
        debug!(
            %repo,
            branch,
            enabled = protection.enabled,
            contexts = ?protection.required_contexts,
            "read branch protection"
        );
        Ok(protection)
    }

    async fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RepoContent>> {
        debug!(%repo, path, git_ref, "reading content");
        let url = format!(
            "{}?ref={}",
            self.repo_url(repo, &format!("contents/{path}")),
            urlencoding::encode(git_ref)
        );

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Lookup(format!("Failed to fetch {path}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%repo, path, git_ref, "content not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Lookup(format!(
                "{path}@{git_ref} of {repo} returned {}",
                response.status()
            )));
        }

        let payload: ContentPayload = response
            .json()
            .await
            .map_err(|e| Error::Lookup(format!("Failed to parse content of {path}: {e}")))?;

        let content = payload
            .content
            .ok_or_else(|| Error::Lookup(format!("{path} has no file content")))?;

        Ok(Some(RepoContent {
            content,
            encoding: payload.encoding,
        }))
    }

    async fn commit_statuses(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckStatus>> {
        debug!(%repo, sha, "listing commit statuses");
        let mut statuses = self.legacy_statuses(repo, sha).await?;
        statuses.extend(self.check_runs(repo, sha).await?);
        debug!(%repo, sha, count = statuses.len(), "listed commit statuses");
        Ok(statuses)
    }

    async fn pr_approvals(&self, repo: &RepoRef, pr_number: u64) -> Result<Vec<String>> {
        debug!(%repo, pr_number, "listing reviews");
        let first = self
            .client
            .pulls(&repo.organization, &repo.name)
            .list_reviews(pr_number)
            .send()
            .await?;
        let reviews = self.client.all_pages(first).await?;

        let approvers = latest_approvers(
            reviews
                .into_iter()
                .filter_map(|r| Some((r.user?.login, r.state?))),
        );

        debug!(%repo, pr_number, count = approvers.len(), "listed approvals");
        Ok(approvers)
    }

    async fn get_pr(&self, repo: &RepoRef, pr_number: u64) -> Result<PullRequestDetails> {
        debug!(%repo, pr_number, "getting PR details");

        let pr = self
            .client
            .pulls(&repo.organization, &repo.name)
            .get(pr_number)
            .await?;

        let state = match pr.state {
            Some(octocrab::models::IssueState::Open) => PrState::Open,
            Some(octocrab::models::IssueState::Closed) if pr.merged_at.is_some() => PrState::Merged,
            // IssueState is non-exhaustive, so use wildcard for Closed and any future variants
            Some(_) | None => PrState::Closed,
        };

        let details = PullRequestDetails {
            number: pr.number,
            body: pr.body.clone(),
            state,
            head_sha: pr.head.sha.clone(),
            assignees: pr
                .assignees
                .as_ref()
                .map(|a| a.iter().map(|u| u.login.clone()).collect())
                .unwrap_or_default(),
        };

        debug!(pr_number, state = ?details.state, head = %details.head_sha, "got PR details");
        Ok(details)
    }

    async fn merge_pr(
        &self,
        repo: &RepoRef,
        pr_number: u64,
        expected_head_sha: &str,
    ) -> Result<MergeResult> {
        debug!(%repo, pr_number, expected_head_sha, "rebase merging PR");

        // The sha precondition makes GitHub reject the merge if the head moved
        let result = self
            .client
            .pulls(&repo.organization, &repo.name)
            .merge(pr_number)
            .method(MergeMethod::Rebase)
            .sha(expected_head_sha)
            .send()
            .await
            .map_err(|e| match Error::from(e) {
                Error::GitHubApi(msg) => Error::GitHubApi(format!("Merge failed: {msg}")),
                transport => transport,
            })?;

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };

        debug!(
            pr_number,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<u64> {
        debug!(%repo, title = %issue.title, "creating issue");
        let created = self
            .client
            .issues(&repo.organization, &repo.name)
            .create(issue.title.clone())
            .body(issue.body.clone())
            .assignees(issue.assignees.clone())
            .send()
            .await?;

        debug!(%repo, issue = created.number, "created issue");
        Ok(created.number)
    }

    async fn create_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        debug!(%repo, number, "creating comment");
        self.client
            .issues(&repo.organization, &repo.name)
            .create_comment(number, body)
            .await?;
        debug!(%repo, number, "created comment");
        Ok(())
    }

    async fn update_pr(
        &self,
        repo: &RepoRef,
        pr_number: u64,
        body: &str,
        assignees: &[String],
    ) -> Result<()> {
        debug!(%repo, pr_number, ?assignees, "updating PR");
        // Assignees are only writable through the issues endpoint
        self.client
            .issues(&repo.organization, &repo.name)
            .update(pr_number)
            .body(body)
            .assignees(assignees)
            .send()
            .await?;
        debug!(%repo, pr_number, "updated PR");
        Ok(())
    }
}
