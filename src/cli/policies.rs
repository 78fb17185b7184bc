//! Policies command implementation.

use clap::Args;

use super::Cli;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::retention::RetentionPolicy;

/// Arguments for the policies command
#[derive(Args, Clone)]
pub struct PoliciesArgs {
    /// Reset the policy table in the config file to the defaults
    #[arg(long)]
    pub init: bool,
}

/// Run the policies command
pub async fn run(cli: &Cli, args: PoliciesArgs) -> Result<()> {
    let mut config = EngineConfig::load_or_init(&cli.config)?;

    if args.init {
        config.policies = RetentionPolicy::defaults();
        config.save(&cli.config)?;
        println!("Policy table reset to defaults in {}", cli.config.display());
    }

    println!(
        "{:<24} {:>10} {:>12} {:>22}",
        "data type", "days", "auto-delete", "backup-before-delete"
    );
    for policy in &config.policies {
        println!(
            "{:<24} {:>10} {:>12} {:>22}",
            policy.data_type.tag(),
            policy.retention_days,
            policy.auto_delete,
            policy.backup_before_delete
        );
    }
    Ok(())
}
