//! Merge executor for mirrored PRs
//!
//! Gating decides whether a PR may be merged; this module only performs
//! the merge and reports what the host said. It never retries.

mod execute;

pub use execute::{MergeOutcome, attempt_merge};
