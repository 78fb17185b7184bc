//! Backup artifact metadata and the on-disk envelope format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BackupScope;
use crate::checksum::Digest;
use crate::error::{Result, VaultError};
use crate::record::DataType;

/// On-disk envelope format version understood by this build.
pub const ENVELOPE_VERSION: u32 = 1;

/// Backup type tag. Closed set with exhaustive handling everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Full,
    Incremental,
    User,
    Scheduled,
}

impl BackupKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Incremental => "incremental",
            BackupKind::User => "user",
            BackupKind::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lifecycle of one backup artifact. Complete artifacts are immutable;
/// superseding means creating a new artifact, never editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Complete,
    Failed,
}

/// Time window covered by an incremental backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Metadata record for one backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArtifact {
    pub id: Uuid,
    pub kind: BackupKind,
    pub scope: BackupScope,
    pub created_at: DateTime<Utc>,
    pub window: Option<BackupWindow>,
    pub covered_types: Vec<DataType>,
    pub location: String,
    pub encrypted: bool,
    pub checksum: Digest,
    pub size_bytes: u64,
    pub record_count: usize,
    pub status: ArtifactStatus,
}

/// Versioned on-disk artifact: envelope fields plus the hex-encoded payload.
///
/// The checksum covers the payload bytes exactly as stored (after optional
/// whole-payload encryption), so integrity is verifiable without the key.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub envelope_version: u32,
    pub id: Uuid,
    pub kind: BackupKind,
    pub scope: BackupScope,
    pub created_at: DateTime<Utc>,
    pub window: Option<BackupWindow>,
    pub covered_types: Vec<DataType>,
    pub encrypted: bool,
    pub checksum: Digest,
    payload: String,
}

impl ArtifactEnvelope {
    /// Build the envelope for an artifact and its final payload bytes.
    pub fn seal(artifact: &BackupArtifact, payload: &[u8]) -> Self {
        Self {
            envelope_version: ENVELOPE_VERSION,
            id: artifact.id,
            kind: artifact.kind,
            scope: artifact.scope.clone(),
            created_at: artifact.created_at,
            window: artifact.window,
            covered_types: artifact.covered_types.clone(),
            encrypted: artifact.encrypted,
            checksum: artifact.checksum.clone(),
            payload: hex::encode(payload),
        }
    }

    /// Parse envelope bytes, rejecting unknown versions.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let envelope: ArtifactEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::format(format!("malformed artifact envelope: {e}")))?;
        if envelope.envelope_version != ENVELOPE_VERSION {
            return Err(VaultError::format(format!(
                "unsupported envelope version {} (expected {})",
                envelope.envelope_version, ENVELOPE_VERSION
            )));
        }
        Ok(envelope)
    }

    /// Decode the stored payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.payload)
            .map_err(|e| VaultError::format(format!("corrupt payload encoding: {e}")))
    }
}

/// Run-unique artifact name: kind + timestamp + random suffix, so concurrent
/// runs of overlapping scope never collide.
pub fn artifact_name(kind: BackupKind, created_at: DateTime<Utc>, id: Uuid) -> String {
    let suffix = &id.simple().to_string()[..8];
    format!(
        "{}-{}-{}.backup.json",
        kind.tag(),
        created_at.format("%Y%m%d_%H%M%S"),
        suffix
    )
}
