//! Restore engine: validates a backup artifact and reconstructs records
//! into the live store.
//!
//! Order of checks is fixed: integrity first (checksum over the stored
//! payload bytes), then at-rest decryption, then format, then field
//! decryption for every record before any write. Field decryption is
//! all-or-nothing per artifact; writes are best-effort per record and the
//! report itemises exactly what happened, so an operator can re-run safely.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backup::ArtifactEnvelope;
use crate::checksum::verify_digest;
use crate::crypto::FieldCipher;
use crate::error::{Result, VaultError};
use crate::record::Record;
use crate::serializer::RecordSerializer;
use crate::store::{ArtifactStore, LiveStore};

/// Per-record outcome of a restore run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RestoreReport {
    pub artifact_id: Uuid,
    pub dry_run: bool,
    pub created: Vec<Uuid>,
    pub replaced: Vec<Uuid>,
    /// Live record was newer or equally old; kept per the conflict policy.
    pub skipped: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.created.len() + self.replaced.len() + self.skipped.len() + self.failed.len()
    }
}

/// Restore engine over the artifact store and the live store.
pub struct RestoreEngine {
    live: Arc<dyn LiveStore>,
    artifacts: Arc<dyn ArtifactStore>,
    serializer: RecordSerializer,
    cipher: Arc<dyn FieldCipher>,
}

impl RestoreEngine {
    pub fn new(
        live: Arc<dyn LiveStore>,
        artifacts: Arc<dyn ArtifactStore>,
        cipher: Arc<dyn FieldCipher>,
    ) -> Self {
        Self {
            live,
            artifacts,
            serializer: RecordSerializer::new(cipher.clone()),
            cipher,
        }
    }

    /// Restore an artifact. With `dry_run` every step runs except the final
    /// writes, and the report shows what a real run would change.
    pub async fn restore(&self, location: &str, dry_run: bool) -> Result<RestoreReport> {
        let envelope_bytes = self.artifacts.read(location).await?;
        let envelope = ArtifactEnvelope::parse(&envelope_bytes)?;

        let mut payload = envelope.payload_bytes()?;
        if !verify_digest(&payload, &envelope.checksum) {
            return Err(VaultError::integrity(format!(
                "checksum mismatch for artifact {location}, refusing to restore"
            )));
        }

        if envelope.encrypted {
            payload = self.cipher.decrypt_payload(&payload)?;
        }

        let records = self.serializer.deserialize(&payload)?;
        // Decrypt every sensitive field up front; a single bad field fails
        // the whole restore before anything is written.
        let records = self.serializer.decrypt_records(records)?;

        info!(
            artifact_id = %envelope.id,
            records = records.len(),
            dry_run,
            "restoring artifact"
        );

        let mut report = RestoreReport {
            artifact_id: envelope.id,
            dry_run,
            ..Default::default()
        };

        for record in records {
            self.apply_record(record, dry_run, &mut report).await;
        }

        info!(
            artifact_id = %envelope.id,
            created = report.created.len(),
            replaced = report.replaced.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "restore complete"
        );
        Ok(report)
    }

    async fn apply_record(&self, record: Record, dry_run: bool, report: &mut RestoreReport) {
        let id = record.id;
        let existing = match self.live.get(record.data_type, id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(record_id = %id, error = %e, "live store lookup failed");
                report.failed.push((id, e.to_string()));
                return;
            }
        };

        match existing {
            // Last-writer-wins; a timestamp tie keeps the live record.
            Some(live) if record.last_modified <= live.last_modified => {
                report.skipped.push(id);
            }
            Some(_) => {
                if dry_run {
                    report.replaced.push(id);
                } else {
                    match self.live.upsert(record).await {
                        Ok(()) => report.replaced.push(id),
                        Err(e) => {
                            warn!(record_id = %id, error = %e, "replace failed");
                            report.failed.push((id, e.to_string()));
                        }
                    }
                }
            }
            None => {
                if dry_run {
                    report.created.push(id);
                } else {
                    match self.live.upsert(record).await {
                        Ok(()) => report.created.push(id),
                        Err(e) => {
                            warn!(record_id = %id, error = %e, "create failed");
                            report.failed.push((id, e.to_string()));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupEngine, BackupScope};
    use crate::config::EngineConfig;
    use crate::crypto::{ChaChaFieldCipher, EncryptionKey, NoopCipher};
    use crate::record::DataType;
    use crate::store::{MemoryArtifactStore, MemoryLiveStore, RecordFilter};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::Value;

    fn cipher(fill: u8) -> Arc<ChaChaFieldCipher> {
        Arc::new(ChaChaFieldCipher::new(&EncryptionKey::new([fill; 32])))
    }

    async fn seeded_artifact(
        live: &Arc<MemoryLiveStore>,
        artifacts: &Arc<MemoryArtifactStore>,
        cipher: Arc<dyn FieldCipher>,
        encrypt: bool,
    ) -> String {
        let profile = Record::new(1, DataType::UserProfiles, Utc::now())
            .with_field("email", "winner@example.com")
            .with_field("phone", "9000000001")
            .with_default_sensitive();
        let bid = Record::new(1, DataType::Bids, Utc::now()).with_field("amount", "750.00");
        live.upsert(profile).await.unwrap();
        live.upsert(bid).await.unwrap();

        let backup = BackupEngine::new(
            live.clone(),
            artifacts.clone(),
            cipher,
            EngineConfig::default(),
        );
        backup
            .run_backup(BackupScope::Full, encrypt)
            .await
            .unwrap()
            .location
    }

    #[tokio::test]
    async fn restore_into_empty_store_recreates_records() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let location = seeded_artifact(&source, &artifacts, cipher(6), true).await;

        let target = Arc::new(MemoryLiveStore::new());
        let engine = RestoreEngine::new(target.clone(), artifacts, cipher(6));
        let report = engine.restore(&location, false).await.unwrap();

        assert_eq!(report.created.len(), 2);
        assert!(report.failed.is_empty());

        let profiles = target
            .fetch(DataType::UserProfiles, RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(profiles.len(), 1);
        // Sensitive fields land decrypted in the live store.
        assert_eq!(
            profiles[0].fields["email"],
            Value::String("winner@example.com".into())
        );
    }

    #[tokio::test]
    async fn dry_run_changes_nothing_but_reports_identical_counts() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let location = seeded_artifact(&source, &artifacts, cipher(6), false).await;

        let target = Arc::new(MemoryLiveStore::new());
        let engine = RestoreEngine::new(target.clone(), artifacts, cipher(6));

        let preview = engine.restore(&location, true).await.unwrap();
        assert!(preview.dry_run);
        assert!(target.is_empty().await);

        let applied = engine.restore(&location, false).await.unwrap();
        assert_eq!(preview.created.len(), applied.created.len());
        assert_eq!(preview.replaced.len(), applied.replaced.len());
        assert_eq!(preview.skipped.len(), applied.skipped.len());
        assert_eq!(target.len().await, 2);
    }

    #[tokio::test]
    async fn conflict_policy_is_last_writer_wins_with_tie_keeping_live() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());

        let stale = Record::new(1, DataType::Orders, Utc::now() - Duration::hours(5))
            .with_field("status", "created");
        let fresh = Record::new(1, DataType::Orders, Utc::now()).with_field("status", "paid");
        source.upsert(stale.clone()).await.unwrap();
        source.upsert(fresh.clone()).await.unwrap();

        let backup = BackupEngine::new(
            source.clone(),
            artifacts.clone(),
            Arc::new(NoopCipher),
            EngineConfig::default(),
        );
        let location = backup
            .run_backup(BackupScope::Full, false)
            .await
            .unwrap()
            .location;

        // Target: stale's live copy is newer than the artifact, fresh's is older.
        let target = Arc::new(MemoryLiveStore::new());
        let mut stale_live = stale.clone();
        stale_live.last_modified = Utc::now();
        let mut fresh_live = fresh.clone();
        fresh_live.last_modified = Utc::now() - Duration::days(1);
        target.upsert(stale_live).await.unwrap();
        target.upsert(fresh_live).await.unwrap();

        let engine = RestoreEngine::new(target.clone(), artifacts, Arc::new(NoopCipher));
        let report = engine.restore(&location, false).await.unwrap();

        assert_eq!(report.skipped, vec![stale.id]);
        assert_eq!(report.replaced, vec![fresh.id]);

        let kept = target.get(DataType::Orders, fresh.id).await.unwrap().unwrap();
        assert_eq!(kept.fields["status"], Value::String("paid".into()));
    }

    #[tokio::test]
    async fn tampered_payload_fails_with_integrity_error() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let location = seeded_artifact(&source, &artifacts, cipher(6), false).await;

        // Flip one byte inside the stored payload and persist under a new
        // location (artifact storage is append-only).
        let mut envelope: serde_json::Value =
            serde_json::from_slice(&artifacts.read(&location).await.unwrap()).unwrap();
        let payload = envelope["payload"].as_str().unwrap().to_string();
        let mut bytes = payload.into_bytes();
        bytes[10] = if bytes[10] == b'a' { b'b' } else { b'a' };
        envelope["payload"] = Value::String(String::from_utf8(bytes).unwrap());

        let tampered = "tampered.backup.json";
        artifacts
            .write(tampered, &serde_json::to_vec(&envelope).unwrap())
            .await
            .unwrap();

        let engine =
            RestoreEngine::new(Arc::new(MemoryLiveStore::new()), artifacts, cipher(6));
        let err = engine.restore(tampered, false).await.unwrap_err();
        assert!(matches!(err, VaultError::Integrity { .. }));
    }

    #[tokio::test]
    async fn wrong_key_fails_with_decryption_error() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let location = seeded_artifact(&source, &artifacts, cipher(1), true).await;

        let engine =
            RestoreEngine::new(Arc::new(MemoryLiveStore::new()), artifacts, cipher(2));
        let err = engine.restore(&location, false).await.unwrap_err();
        assert!(matches!(err, VaultError::Decryption { .. }));
    }

    /// Live store that refuses writes for one record id.
    struct RejectingStore {
        inner: MemoryLiveStore,
        reject: Uuid,
    }

    #[async_trait]
    impl LiveStore for RejectingStore {
        async fn fetch(
            &self,
            data_type: DataType,
            filter: RecordFilter,
        ) -> Result<Vec<Record>> {
            self.inner.fetch(data_type, filter).await
        }
        async fn get(&self, data_type: DataType, id: Uuid) -> Result<Option<Record>> {
            self.inner.get(data_type, id).await
        }
        async fn upsert(&self, record: Record) -> Result<()> {
            if record.id == self.reject {
                return Err(VaultError::store("write refused"));
            }
            self.inner.upsert(record).await
        }
        async fn delete(&self, data_type: DataType, id: Uuid) -> Result<bool> {
            self.inner.delete(data_type, id).await
        }
    }

    #[tokio::test]
    async fn partial_write_failure_is_itemised_not_rolled_back() {
        let source = Arc::new(MemoryLiveStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());

        let a = Record::new(1, DataType::Bids, Utc::now()).with_field("amount", "1.00");
        let b = Record::new(1, DataType::Bids, Utc::now()).with_field("amount", "2.00");
        let (a_id, b_id) = (a.id, b.id);
        source.upsert(a).await.unwrap();
        source.upsert(b).await.unwrap();

        let backup = BackupEngine::new(
            source,
            artifacts.clone(),
            Arc::new(NoopCipher),
            EngineConfig::default(),
        );
        let location = backup
            .run_backup(BackupScope::Full, false)
            .await
            .unwrap()
            .location;

        let target = Arc::new(RejectingStore {
            inner: MemoryLiveStore::new(),
            reject: b_id,
        });
        let engine = RestoreEngine::new(target.clone(), artifacts, Arc::new(NoopCipher));
        let report = engine.restore(&location, false).await.unwrap();

        assert_eq!(report.created, vec![a_id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, b_id);
        // Successful write stays applied.
        assert!(target.get(DataType::Bids, a_id).await.unwrap().is_some());
    }
}
