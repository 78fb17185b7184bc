//! Backup command implementation.

use clap::Args;

use super::{Cli, Context};
use crate::backup::BackupScope;
use crate::error::{Result, VaultError};
use crate::record::OwnerId;

/// Arguments for the backup command
#[derive(Args, Clone)]
pub struct BackupArgs {
    /// Backup type: full, incremental, user or scheduled
    #[arg(short, long, default_value = "full")]
    pub kind: String,

    /// Owner id, required for user backups
    #[arg(long)]
    pub owner: Option<OwnerId>,

    /// Additionally encrypt the whole payload at rest
    #[arg(long)]
    pub encrypt: bool,
}

/// Run the backup command
pub async fn run(cli: &Cli, args: BackupArgs) -> Result<()> {
    let scope = match args.kind.as_str() {
        "full" => BackupScope::Full,
        "incremental" => BackupScope::Incremental,
        "user" => BackupScope::User {
            owner: args
                .owner
                .ok_or_else(|| VaultError::backup("user backup requires --owner"))?,
        },
        "scheduled" => BackupScope::Scheduled,
        other => {
            return Err(VaultError::backup(format!(
                "unknown backup type '{other}' (expected full, incremental, user or scheduled)"
            )))
        }
    };

    let ctx = Context::build(cli).await?;
    let artifact = ctx.backup_engine().run_backup(scope, args.encrypt).await?;

    println!("Backup completed successfully!");
    println!("  Artifact ID: {}", artifact.id);
    println!("  Location: {}", artifact.location);
    println!("  Records: {}", artifact.record_count);
    println!("  Size: {} bytes", artifact.size_bytes);
    println!("  Checksum: {}", artifact.checksum);
    Ok(())
}
