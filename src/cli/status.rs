//! Status command - list stored pending PR records

use crate::cli::context::CommandContext;
use crate::cli::style::Stylize;
use anstream::println;
use magic_mirror::error::Result;
use magic_mirror::store::Store;
use magic_mirror::types::SyncAction;
use std::path::Path;

/// Run the status command
pub fn run_status(config_path: &Path) -> Result<()> {
    let ctx = CommandContext::new(config_path)?;
    let records = ctx.store.list(&ctx.config.fork)?;

    if records.is_empty() {
        println!("{}", "No pending PR records.".muted());
        return Ok(());
    }

    for record in &records {
        let action = match record.action {
            SyncAction::Pending => record.action.to_string().accent(),
            SyncAction::Merged => record.action.to_string().success(),
            SyncAction::Blocked { .. } => record.action.to_string().warn(),
        };
        let pr = record
            .pr_id
            .map_or_else(|| "no PR".to_string(), |n| format!("PR #{n}"));
        println!(
            "{} {} {} {}",
            record.branch.emphasis(),
            action,
            pr.muted(),
            format!("upstream {}", record.upstream_pr_list()).muted()
        );
    }
    Ok(())
}
