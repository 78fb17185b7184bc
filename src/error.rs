//! Error types for recordvault operations.

use thiserror::Error;

/// Main error type for recordvault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("integrity verification failed: {reason}")]
    Integrity { reason: String },

    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    #[error("artifact format error: {reason}")]
    Format { reason: String },

    #[error("backup run failed: {reason}")]
    Backup { reason: String },

    #[error("restore failed: {reason}")]
    Restore { reason: String },

    #[error("export unavailable: {reason}")]
    Export { reason: String },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl VaultError {
    pub fn integrity(reason: impl Into<String>) -> Self {
        Self::Integrity {
            reason: reason.into(),
        }
    }

    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    pub fn backup(reason: impl Into<String>) -> Self {
        Self::Backup {
            reason: reason.into(),
        }
    }

    pub fn restore(reason: impl Into<String>) -> Self {
        Self::Restore {
            reason: reason.into(),
        }
    }

    pub fn export(reason: impl Into<String>) -> Self {
        Self::Export {
            reason: reason.into(),
        }
    }

    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

/// Result type alias for recordvault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
