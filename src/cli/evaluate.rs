//! Evaluate command - run one sync cycle per branch

use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use magic_mirror::error::Result;
use magic_mirror::sync::{CycleOutcome, evaluate_branch};
use std::path::Path;
use tracing::error;

/// Run the evaluate command
///
/// Branches are evaluated one after another. Returns the number of
/// branches whose cycle errored.
pub async fn run_evaluate(config_path: &Path, token: &str, branches: &[String]) -> Result<usize> {
    let ctx = CommandContext::new(config_path)?;
    let platform = ctx.platform(token)?;
    let policy = ctx.config.gate_policy();
    let fork = &ctx.config.fork;
    let upstream = &ctx.config.upstream;

    println!(
        "{} {}",
        "Evaluating".emphasis(),
        format!("{fork} ({} branch(es))", ctx.branches(branches).len()).accent()
    );

    let mut failures = 0;
    for branch in ctx.branches(branches) {
        match evaluate_branch(&platform, &ctx.store, fork, upstream, branch, &policy).await {
            Ok(outcome) => print_outcome(branch, &outcome),
            Err(e) => {
                failures += 1;
                error!(%fork, branch = %branch, error = %e, "sync cycle failed");
                println!("  {} {}: {}", "✗".warn(), branch.accent(), e.to_string().warn());
            }
        }
    }

    Ok(failures)
}

fn print_outcome(branch: &str, outcome: &CycleOutcome) {
    let line = outcome.to_string();
    let styled = match outcome {
        CycleOutcome::Merged { .. } => format!("{CHECK} {line}").success(),
        CycleOutcome::Blocked { .. } | CycleOutcome::Paused { .. } => line.warn(),
        CycleOutcome::Idle | CycleOutcome::Waiting { .. } => line.muted(),
    };
    println!("  {}: {styled}", branch.accent());
}
