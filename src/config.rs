//! Engine configuration.
//!
//! Loaded once at process start and immutable thereafter; a running engine
//! never observes a config change. Reloading means constructing a new engine.

use std::fs;
use std::path::Path;

use chacha20poly1305::aead::{KeyInit, OsRng};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::EncryptionKey;
use crate::error::{Result, VaultError};
use crate::retention::RetentionPolicy;

/// Configuration object passed into the engines at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hex-encoded 256-bit field encryption key.
    pub encryption_key: String,
    /// Selection window for incremental backups, in hours.
    pub incremental_window_hours: i64,
    /// How long a data export stays downloadable, in days.
    pub export_ttl_days: i64,
    /// Retention policy table, one entry per data type.
    #[serde(rename = "policy", default)]
    pub policies: Vec<RetentionPolicy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encryption_key: generate_key_hex(),
            incremental_window_hours: 24,
            export_ttl_days: 7,
            policies: RetentionPolicy::defaults(),
        }
    }
}

impl EngineConfig {
    /// Load config from file, or create a default one (with a freshly
    /// generated key) if it does not exist yet.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("loading config from {}", path.display());
            let content = fs::read_to_string(path)?;
            let config: EngineConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            warn!(
                "config not found at {}, generating one with a new encryption key; \
                 store it securely, data encrypted with it is unrecoverable otherwise",
                path.display()
            );
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save config to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaultError::config(format!("failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        debug!("config saved to {}", path.display());
        Ok(())
    }

    /// Parse the configured encryption key.
    pub fn key(&self) -> Result<EncryptionKey> {
        EncryptionKey::from_hex(&self.encryption_key)
    }

    /// Policy for a data type, if one is configured.
    pub fn policy_for(&self, tag: &str) -> Option<&RetentionPolicy> {
        self.policies.iter().find(|p| p.data_type.tag() == tag)
    }

    /// Validate config settings.
    pub fn validate(&self) -> Result<()> {
        self.key()?;

        if self.incremental_window_hours <= 0 {
            return Err(VaultError::config(
                "incremental window must be greater than 0",
            ));
        }
        if self.export_ttl_days <= 0 {
            return Err(VaultError::config("export TTL must be greater than 0"));
        }

        for policy in &self.policies {
            if policy.retention_days == 0 {
                return Err(VaultError::config(format!(
                    "retention for {} must be greater than 0 days",
                    policy.data_type
                )));
            }
            if policy.retention_days < 30 {
                warn!(
                    data_type = %policy.data_type,
                    days = policy.retention_days,
                    "unusually short retention configured"
                );
            }
        }
        Ok(())
    }
}

/// Generate a fresh random key as hex.
pub fn generate_key_hex() -> String {
    hex::encode(ChaCha20Poly1305::generate_key(&mut OsRng))
}
