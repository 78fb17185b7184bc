//! # recordvault
//!
//! Backup, retention and restore engine for multi-tenant structured records.
//!
//! ## Features
//!
//! - **Backup Engine**: full, incremental, user-scoped and policy-driven
//!   scheduled runs with BLAKE3 checksums and versioned artifact envelopes
//! - **Field Encryption**: ChaCha20-Poly1305 over individual sensitive
//!   fields, with optional whole-payload encryption at rest
//! - **Retention Engine**: per-data-type policies with backup-before-delete
//!   guarantees and deferral on failure
//! - **Restore Engine**: integrity-verified, last-writer-wins restores with
//!   a risk-free dry-run mode
//! - **Exports**: exactly-once, time-limited downloads of one owner's data
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recordvault::backup::{BackupEngine, BackupScope};
//! use recordvault::config::EngineConfig;
//! use recordvault::crypto::ChaChaFieldCipher;
//! use recordvault::store::{FsArtifactStore, MemoryLiveStore};
//!
//! # #[tokio::main]
//! # async fn main() -> recordvault::Result<()> {
//! let config = EngineConfig::default();
//! let cipher = Arc::new(ChaChaFieldCipher::new(&config.key()?));
//! let engine = BackupEngine::new(
//!     Arc::new(MemoryLiveStore::new()),
//!     Arc::new(FsArtifactStore::new(std::path::Path::new("./artifacts"))),
//!     cipher,
//!     config,
//! );
//!
//! let artifact = engine.run_backup(BackupScope::Full, true).await?;
//! println!("backup complete: {}", artifact.location);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub mod logging;
pub mod record;
pub mod restore;
pub mod retention;
pub mod serializer;
pub mod store;

// Re-export commonly used types
pub use backup::{BackupArtifact, BackupEngine, BackupScope};
pub use error::{Result, VaultError};
pub use record::{DataType, Record};
pub use restore::{RestoreEngine, RestoreReport};
pub use retention::{RetentionEngine, RetentionPolicy, RetentionReport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
