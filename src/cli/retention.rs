//! Retention command implementation.

use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use super::{Cli, Context};
use crate::error::Result;
use crate::retention::RetentionEngine;

/// Arguments for the retention command
#[derive(Args, Clone)]
pub struct RetentionArgs {
    /// Apply the decisions instead of only reporting them
    #[arg(long)]
    pub apply: bool,
}

/// Run the retention command
pub async fn run(cli: &Cli, args: RetentionArgs) -> Result<()> {
    let ctx = Context::build(cli).await?;
    let engine = RetentionEngine::new(ctx.live.clone(), Arc::new(ctx.backup_engine()));

    let decisions = engine.evaluate(&ctx.config.policies, Utc::now()).await?;
    println!("Retention decisions: {}", decisions.len());
    for decision in &decisions {
        println!(
            "  {} {} (owner {}, modified {}): {:?}",
            decision.data_type,
            decision.record_id,
            decision.owner,
            decision.last_modified.format("%Y-%m-%d %H:%M:%S"),
            decision.action
        );
    }

    if !args.apply {
        println!("\nEvaluation only; pass --apply to act on these decisions");
        return Ok(());
    }

    let report = engine.apply(decisions).await?;
    println!("Retention applied:");
    println!("  Kept: {}", report.kept);
    println!("  Deleted: {}", report.deleted.len());
    println!("  Deferred: {}", report.deferred.len());
    for location in &report.covering_artifacts {
        println!("  Covering artifact: {location}");
    }
    Ok(())
}
