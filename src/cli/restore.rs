//! Restore command implementation.

use clap::Args;

use super::{Cli, Context};
use crate::error::Result;
use crate::restore::RestoreEngine;

/// Arguments for the restore command
#[derive(Args, Clone)]
pub struct RestoreArgs {
    /// Artifact location (file name under the output directory)
    pub artifact: String,

    /// Preview the restore without writing to the live store
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the restore command
pub async fn run(cli: &Cli, args: RestoreArgs) -> Result<()> {
    let ctx = Context::build(cli).await?;
    let engine = RestoreEngine::new(ctx.live.clone(), ctx.artifacts.clone(), ctx.cipher.clone());

    let report = engine.restore(&args.artifact, args.dry_run).await?;

    if report.dry_run {
        println!("Dry run - no changes were written");
    }
    println!("Restore report for artifact {}:", report.artifact_id);
    println!("  Created: {}", report.created.len());
    println!("  Replaced: {}", report.replaced.len());
    println!("  Skipped (live record kept): {}", report.skipped.len());
    println!("  Failed: {}", report.failed.len());
    for (id, reason) in &report.failed {
        println!("    {id}: {reason}");
    }
    Ok(())
}
