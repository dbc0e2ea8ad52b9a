//! magic-mirror - keep a fork branch in sync with merged upstream PRs
//!
//! Each fork branch has at most one pending mirrored PR. A sync cycle gates
//! it on required status checks and owner approval, merges it at the head
//! that was evaluated, and on failure opens a tracking issue that pauses
//! the branch until a human closes it.

pub mod config;
pub mod error;
pub mod gate;
pub mod merge;
pub mod notify;
pub mod platform;
pub mod report;
pub mod store;
pub mod sync;
pub mod types;
