//! Command-line interface for recordvault.
//!
//! Thin glue over the engine's public operations: each subcommand builds the
//! engines from the configured stores, invokes one operation, and prints the
//! returned report.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::EngineConfig;
use crate::crypto::ChaChaFieldCipher;
use crate::error::Result;
use crate::store::{FsArtifactStore, JsonFileLiveStore};

pub mod backup;
pub mod export;
pub mod policies;
pub mod restore;
pub mod retention;

/// recordvault - backup, retention and restore for structured records
#[derive(Parser)]
#[command(name = "recordvault")]
#[command(about = "Backup, retention and restore engine for multi-tenant structured records")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to the engine config file
    #[arg(long, global = true, default_value = "recordvault.toml")]
    pub config: PathBuf,

    /// Path to the live store JSON file
    #[arg(long, global = true, default_value = "live.json")]
    pub store: PathBuf,

    /// Directory holding backup artifacts
    #[arg(long, global = true, default_value = "backups")]
    pub output: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a backup
    Backup(backup::BackupArgs),
    /// Restore records from a backup artifact
    Restore(restore::RestoreArgs),
    /// Evaluate and optionally apply retention policies
    Retention(retention::RetentionArgs),
    /// Request or download a per-owner data export
    Export(export::ExportArgs),
    /// Inspect or initialise the retention policy table
    Policies(policies::PoliciesArgs),
}

/// Engines shared by the subcommands.
pub struct Context {
    pub config: EngineConfig,
    pub live: Arc<JsonFileLiveStore>,
    pub artifacts: Arc<FsArtifactStore>,
    pub cipher: Arc<ChaChaFieldCipher>,
}

impl Context {
    pub async fn build(cli: &Cli) -> Result<Self> {
        let config = EngineConfig::load_or_init(&cli.config)?;
        let cipher = Arc::new(ChaChaFieldCipher::new(&config.key()?));
        Ok(Self {
            config,
            live: Arc::new(JsonFileLiveStore::open(&cli.store).await?),
            artifacts: Arc::new(FsArtifactStore::new(&cli.output)),
            cipher,
        })
    }

    pub fn backup_engine(&self) -> crate::backup::BackupEngine {
        crate::backup::BackupEngine::new(
            self.live.clone(),
            self.artifacts.clone(),
            self.cipher.clone(),
            self.config.clone(),
        )
    }
}
