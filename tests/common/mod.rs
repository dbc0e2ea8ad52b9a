//! Shared test helpers

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::{
    CreateCommentCall, MergePrCall, MockPlatformService, UpdatePrCall, make_pr,
};

use magic_mirror::types::{PendingPr, RepoRef};

/// The fork used throughout the tests
pub fn fork() -> RepoRef {
    RepoRef::new("acme", "widgets")
}

/// The upstream used throughout the tests
pub fn upstream() -> RepoRef {
    RepoRef::new("upstream-org", "widgets")
}

/// Pending record for `branch` mirroring upstream PRs 101 and 102
pub fn pending_record(branch: &str, pr_id: Option<u64>) -> PendingPr {
    let record = PendingPr::new(
        fork(),
        upstream(),
        branch,
        vec![101, 102],
        ["alice".to_string(), "bob".to_string()],
    )
    .expect("valid record");
    match pr_id {
        Some(n) => record.with_pr(n),
        None => record,
    }
}
