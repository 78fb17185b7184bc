//! Backup engine: selects records, encrypts, checksums, and persists
//! versioned backup artifacts.
//!
//! A run is one bounded unit of work: select per scope, serialize (sensitive
//! fields encrypted by the serializer), optionally encrypt the whole payload
//! at rest, checksum the final bytes, write the artifact under a run-unique
//! name, and record its metadata. Selection uses a single snapshot timestamp
//! taken at run start, so records becoming eligible mid-run are never
//! included.

mod artifact;

pub use artifact::{
    ArtifactEnvelope, ArtifactStatus, BackupArtifact, BackupKind, BackupWindow, ENVELOPE_VERSION,
};

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::checksum::compute_digest;
use crate::config::EngineConfig;
use crate::crypto::FieldCipher;
use crate::error::{Result, VaultError};
use crate::record::{DataType, OwnerId, Record};
use crate::serializer::RecordSerializer;
use crate::store::{ArtifactStore, LiveStore, RecordFilter};

/// Selection criteria for one backup run. Closed set: adding a scope is a
/// compile-time extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackupScope {
    /// All records regardless of timestamp.
    Full,
    /// Records modified within the configured window before run start.
    Incremental,
    /// Records owned by one account, across all data types.
    User { owner: OwnerId },
    /// Data types chosen by consulting the retention policy table.
    Scheduled,
}

impl BackupScope {
    pub fn kind(&self) -> BackupKind {
        match self {
            BackupScope::Full => BackupKind::Full,
            BackupScope::Incremental => BackupKind::Incremental,
            BackupScope::User { .. } => BackupKind::User,
            BackupScope::Scheduled => BackupKind::Scheduled,
        }
    }
}

/// Backup engine over a live store and an artifact store.
pub struct BackupEngine {
    live: Arc<dyn LiveStore>,
    artifacts: Arc<dyn ArtifactStore>,
    serializer: RecordSerializer,
    cipher: Arc<dyn FieldCipher>,
    config: EngineConfig,
}

impl BackupEngine {
    pub fn new(
        live: Arc<dyn LiveStore>,
        artifacts: Arc<dyn ArtifactStore>,
        cipher: Arc<dyn FieldCipher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            live,
            artifacts,
            serializer: RecordSerializer::new(cipher.clone()),
            cipher,
            config,
        }
    }

    /// Run one backup. On success the returned artifact is `Complete` and its
    /// envelope plus metadata sidecar are durably written; on failure nothing
    /// half-written is ever marked complete.
    pub async fn run_backup(&self, scope: BackupScope, encrypt: bool) -> Result<BackupArtifact> {
        let snapshot_at = Utc::now();
        let artifact_id = Uuid::new_v4();

        info!(
            artifact_id = %artifact_id,
            scope = ?scope,
            encrypt,
            "starting backup run"
        );

        let window = match scope {
            BackupScope::Incremental => Some(BackupWindow {
                since: snapshot_at - Duration::hours(self.config.incremental_window_hours),
                until: snapshot_at,
            }),
            _ => None,
        };

        let (records, covered_types) = self.select(&scope, &window, snapshot_at).await?;
        let record_count = records.len();

        let mut payload = self.serializer.serialize(&records)?;
        if encrypt {
            payload = self.cipher.encrypt_payload(&payload)?;
        }
        let checksum = compute_digest(&payload);

        let mut artifact = BackupArtifact {
            id: artifact_id,
            kind: scope.kind(),
            scope: scope.clone(),
            created_at: snapshot_at,
            window,
            covered_types,
            location: artifact::artifact_name(scope.kind(), snapshot_at, artifact_id),
            encrypted: encrypt,
            checksum,
            size_bytes: payload.len() as u64,
            record_count,
            status: ArtifactStatus::Pending,
        };

        let envelope = ArtifactEnvelope::seal(&artifact, &payload);
        let envelope_bytes = serde_json::to_vec(&envelope)?;

        if let Err(e) = self.artifacts.write(&artifact.location, &envelope_bytes).await {
            artifact.status = ArtifactStatus::Failed;
            error!(artifact_id = %artifact.id, error = %e, "backup run abandoned");
            self.record_metadata(&artifact).await;
            return Err(VaultError::backup(format!(
                "failed to write artifact {}: {e}",
                artifact.location
            )));
        }

        artifact.status = ArtifactStatus::Complete;
        self.record_metadata(&artifact).await;

        info!(
            artifact_id = %artifact.id,
            location = %artifact.location,
            records = record_count,
            size_bytes = artifact.size_bytes,
            "backup run complete"
        );
        Ok(artifact)
    }

    /// Select records per scope, all against the same snapshot timestamp.
    async fn select(
        &self,
        scope: &BackupScope,
        window: &Option<BackupWindow>,
        snapshot_at: chrono::DateTime<Utc>,
    ) -> Result<(Vec<Record>, Vec<DataType>)> {
        let (types, filter): (Vec<DataType>, RecordFilter) = match scope {
            BackupScope::Full => (
                DataType::ALL.to_vec(),
                RecordFilter {
                    modified_until: Some(snapshot_at),
                    ..Default::default()
                },
            ),
            BackupScope::Incremental => {
                let window = window
                    .as_ref()
                    .ok_or_else(|| VaultError::backup("incremental scope without a window"))?;
                (
                    DataType::ALL.to_vec(),
                    RecordFilter {
                        modified_since: Some(window.since),
                        modified_until: Some(window.until),
                        ..Default::default()
                    },
                )
            }
            BackupScope::User { owner } => (
                DataType::ALL.to_vec(),
                RecordFilter {
                    owner: Some(*owner),
                    modified_until: Some(snapshot_at),
                    ..Default::default()
                },
            ),
            BackupScope::Scheduled => (
                self.config
                    .policies
                    .iter()
                    .map(|p| p.data_type)
                    .collect(),
                RecordFilter {
                    modified_until: Some(snapshot_at),
                    ..Default::default()
                },
            ),
        };

        let mut records = Vec::new();
        for data_type in &types {
            records.extend(self.live.fetch(*data_type, filter.clone()).await?);
        }
        Ok((records, types))
    }

    /// Write the metadata sidecar. Best-effort for failed runs: the primary
    /// failure is what surfaces to the caller.
    async fn record_metadata(&self, artifact: &BackupArtifact) {
        let location = format!("{}.meta.json", artifact.location);
        match serde_json::to_vec_pretty(artifact) {
            Ok(bytes) => {
                if let Err(e) = self.artifacts.write(&location, &bytes).await {
                    error!(artifact_id = %artifact.id, error = %e, "failed to record backup metadata");
                }
            }
            Err(e) => {
                error!(artifact_id = %artifact.id, error = %e, "failed to serialize backup metadata")
            }
        }
    }
}
