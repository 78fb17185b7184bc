//! Owner-initiated data exports.
//!
//! An export is a user-scoped, whole-payload-encrypted backup artifact with
//! a download window. Exactly-once download is enforced here, not merely
//! recorded: once consumed or past expiry the artifact location is never
//! handed out again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::backup::{BackupEngine, BackupScope};
use crate::config::EngineConfig;
use crate::error::{Result, VaultError};
use crate::record::OwnerId;

/// A caller-initiated export of a single owner's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataExportRequest {
    pub id: Uuid,
    pub owner: OwnerId,
    pub requested_at: DateTime<Utc>,
    pub artifact_location: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl DataExportRequest {
    /// Whether a download would currently be served.
    pub fn downloadable(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && now <= self.expires_at
    }
}

/// Export workflow over the backup engine.
pub struct ExportService {
    backup: Arc<BackupEngine>,
    ttl: Duration,
}

impl ExportService {
    pub fn new(backup: Arc<BackupEngine>, config: &EngineConfig) -> Self {
        Self {
            backup,
            ttl: Duration::days(config.export_ttl_days),
        }
    }

    /// Create an export: runs a user-scoped encrypted backup and opens the
    /// download window.
    pub async fn request_export(&self, owner: OwnerId) -> Result<DataExportRequest> {
        let artifact = self
            .backup
            .run_backup(BackupScope::User { owner }, true)
            .await?;

        let request = DataExportRequest {
            id: Uuid::new_v4(),
            owner,
            requested_at: artifact.created_at,
            artifact_location: artifact.location,
            expires_at: artifact.created_at + self.ttl,
            consumed: false,
        };
        info!(
            request_id = %request.id,
            owner,
            expires_at = %request.expires_at,
            "export prepared"
        );
        Ok(request)
    }

    /// Serve the download exactly once. Consumes the request on success;
    /// refused once expired or already consumed.
    pub fn take_download(
        &self,
        request: &mut DataExportRequest,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if request.consumed {
            return Err(VaultError::export(format!(
                "export {} already downloaded",
                request.id
            )));
        }
        if now > request.expires_at {
            return Err(VaultError::export(format!(
                "export {} expired at {}",
                request.id, request.expires_at
            )));
        }
        request.consumed = true;
        Ok(request.artifact_location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ChaChaFieldCipher, EncryptionKey};
    use crate::record::{DataType, Record};
    use crate::store::{ArtifactStore, LiveStore, MemoryArtifactStore, MemoryLiveStore};

    async fn service(artifacts: Arc<MemoryArtifactStore>) -> ExportService {
        let live = Arc::new(MemoryLiveStore::new());
        live.upsert(
            Record::new(11, DataType::UserProfiles, Utc::now())
                .with_field("email", "owner@example.com")
                .with_default_sensitive(),
        )
        .await
        .unwrap();

        let config = EngineConfig::default();
        let backup = Arc::new(BackupEngine::new(
            live,
            artifacts,
            Arc::new(ChaChaFieldCipher::new(&EncryptionKey::new([8; 32]))),
            config.clone(),
        ));
        ExportService::new(backup, &config)
    }

    #[tokio::test]
    async fn export_is_downloadable_exactly_once() {
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let service = service(artifacts.clone()).await;

        let mut request = service.request_export(11).await.unwrap();
        assert!(artifacts.exists(&request.artifact_location).await.unwrap());
        assert!(request.downloadable(Utc::now()));

        let location = service.take_download(&mut request, Utc::now()).unwrap();
        assert_eq!(location, request.artifact_location);
        assert!(request.consumed);

        let err = service.take_download(&mut request, Utc::now()).unwrap_err();
        assert!(matches!(err, VaultError::Export { .. }));
    }

    #[tokio::test]
    async fn expired_export_is_refused() {
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let service = service(artifacts).await;

        let mut request = service.request_export(11).await.unwrap();
        let after_expiry = request.expires_at + Duration::hours(1);
        assert!(!request.downloadable(after_expiry));

        let err = service.take_download(&mut request, after_expiry).unwrap_err();
        assert!(matches!(err, VaultError::Export { .. }));
        // Refusal does not consume; it stays refused for being expired.
        assert!(!request.consumed);
    }
}
