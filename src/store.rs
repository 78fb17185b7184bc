//! Store seams the engine talks through.
//!
//! [`LiveStore`] abstracts the system of record holding live domain entities;
//! [`ArtifactStore`] abstracts backup artifact storage, addressed by opaque
//! location strings and append-only from the engine's perspective. Reference
//! implementations here cover in-memory use (tests), a JSON file (CLI), and
//! a plain directory for artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::record::{DataType, OwnerId, Record};

/// Selection filters for fetching records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub owner: Option<OwnerId>,
    pub modified_since: Option<DateTime<Utc>>,
    pub modified_until: Option<DateTime<Utc>>,
}

impl RecordFilter {
    fn matches(&self, record: &Record) -> bool {
        if let Some(owner) = self.owner {
            if record.owner != owner {
                return false;
            }
        }
        if let Some(since) = self.modified_since {
            if record.last_modified < since {
                return false;
            }
        }
        if let Some(until) = self.modified_until {
            if record.last_modified > until {
                return false;
            }
        }
        true
    }
}

/// Accessor for the live system of record.
///
/// `fetch` returns a cloned snapshot; mutations are per-record atomic so
/// concurrent unrelated writes never observe half-updated state.
#[async_trait]
pub trait LiveStore: Send + Sync {
    async fn fetch(&self, data_type: DataType, filter: RecordFilter) -> Result<Vec<Record>>;
    async fn get(&self, data_type: DataType, id: Uuid) -> Result<Option<Record>>;
    async fn upsert(&self, record: Record) -> Result<()>;
    /// Returns true when a record was actually removed.
    async fn delete(&self, data_type: DataType, id: Uuid) -> Result<bool>;
}

/// Accessor for backup artifact storage.
///
/// Locations are written once under unique names and never overwritten;
/// `write` refuses an existing location.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn write(&self, location: &str, bytes: &[u8]) -> Result<()>;
    async fn read(&self, location: &str) -> Result<Vec<u8>>;
    async fn exists(&self, location: &str) -> Result<bool>;
}

/// In-memory live store.
#[derive(Debug, Default)]
pub struct MemoryLiveStore {
    records: RwLock<HashMap<(DataType, Uuid), Record>>,
}

impl MemoryLiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LiveStore for MemoryLiveStore {
    async fn fetch(&self, data_type: DataType, filter: RecordFilter) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        let mut out: Vec<Record> = records
            .values()
            .filter(|r| r.data_type == data_type && filter.matches(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    async fn get(&self, data_type: DataType, id: Uuid) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(&(data_type, id)).cloned())
    }

    async fn upsert(&self, record: Record) -> Result<()> {
        self.records
            .write()
            .await
            .insert((record.data_type, record.id), record);
        Ok(())
    }

    async fn delete(&self, data_type: DataType, id: Uuid) -> Result<bool> {
        Ok(self.records.write().await.remove(&(data_type, id)).is_some())
    }
}

/// Live store backed by a single JSON file, for the CLI.
///
/// The whole record set is held in memory and flushed atomically
/// (tmp + rename) after every mutation.
#[derive(Debug)]
pub struct JsonFileLiveStore {
    path: PathBuf,
    records: RwLock<HashMap<(DataType, Uuid), Record>>,
}

impl JsonFileLiveStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let content = fs::read(path).await?;
            let list: Vec<Record> = serde_json::from_slice(&content)?;
            list.into_iter()
                .map(|r| ((r.data_type, r.id), r))
                .collect()
        } else {
            HashMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            records: RwLock::new(records),
        })
    }

    async fn flush(&self, records: &HashMap<(DataType, Uuid), Record>) -> Result<()> {
        let mut list: Vec<&Record> = records.values().collect();
        list.sort_by_key(|r| r.id);
        let content = serde_json::to_vec_pretty(&list)?;

        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LiveStore for JsonFileLiveStore {
    async fn fetch(&self, data_type: DataType, filter: RecordFilter) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        let mut out: Vec<Record> = records
            .values()
            .filter(|r| r.data_type == data_type && filter.matches(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    async fn get(&self, data_type: DataType, id: Uuid) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(&(data_type, id)).cloned())
    }

    async fn upsert(&self, record: Record) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert((record.data_type, record.id), record);
        self.flush(&records).await
    }

    async fn delete(&self, data_type: DataType, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        let removed = records.remove(&(data_type, id)).is_some();
        if removed {
            self.flush(&records).await?;
        }
        Ok(removed)
    }
}

/// Artifact store writing to a directory, one file per location.
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write(&self, location: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(location);
        if path.exists() {
            return Err(VaultError::store(format!(
                "artifact location already exists: {location}"
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temporary name first, then rename into place.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location);
        if !path.exists() {
            return Err(VaultError::store(format!("artifact not found: {location}")));
        }
        Ok(fs::read(&path).await?)
    }

    async fn exists(&self, location: &str) -> Result<bool> {
        Ok(self.resolve(location).exists())
    }
}

/// In-memory artifact store for tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write(&self, location: &str, bytes: &[u8]) -> Result<()> {
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(location) {
            return Err(VaultError::store(format!(
                "artifact location already exists: {location}"
            )));
        }
        artifacts.insert(location.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>> {
        self.artifacts
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| VaultError::store(format!("artifact not found: {location}")))
    }

    async fn exists(&self, location: &str) -> Result<bool> {
        Ok(self.artifacts.read().await.contains_key(location))
    }
}
