//! Processed-item store backed by a JSON document on disk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{merge_decision, MergeDecision, ProcessedItemStore};
use crate::core::{ProcessingRecord, Stage};
use crate::errors::StoreError;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    records: BTreeMap<String, ProcessingRecord>,
}

/// Store persisted as `{"version": 1, "records": {id: record}}`.
///
/// Every write replaces the whole document through a temporary file in the
/// same directory followed by an atomic rename, so readers see either the
/// previous or the new state.
#[derive(Debug)]
pub struct JsonFileProcessedItemStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ProcessingRecord>>,
}

impl JsonFileProcessedItemStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let document: StoreDocument = serde_json::from_slice(&bytes)?;
                if document.version != STORE_VERSION {
                    return Err(StoreError::UnsupportedVersion {
                        found: document.version,
                        expected: STORE_VERSION,
                    });
                }
                validate_records(&document.records)?;
                document.records
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        debug!(path = %path.display(), records = records.len(), "Opened item store");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &BTreeMap<String, ProcessingRecord>) -> Result<(), StoreError> {
        let document = StoreDocument {
            version: STORE_VERSION,
            records: records.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Backend(format!("store writer task failed: {e}")))?
    }
}

fn validate_records(records: &BTreeMap<String, ProcessingRecord>) -> Result<(), StoreError> {
    for (key, record) in records {
        if key != record.item_id() {
            return Err(StoreError::Backend(format!(
                "record stored under '{key}' belongs to item '{}'",
                record.item_id()
            )));
        }
        record
            .check_consistency()
            .map_err(|e| StoreError::Backend(format!("inconsistent record: {e}")))?;
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl ProcessedItemStore for JsonFileProcessedItemStore {
    async fn has_succeeded(&self, item_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .get(item_id)
            .is_some_and(|r| r.stage() == Stage::Published))
    }

    async fn record_outcome(&self, record: &ProcessingRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;

        match merge_decision(records.get(record.item_id()), record) {
            MergeDecision::Unchanged => return Ok(()),
            MergeDecision::KeepPublished => {
                warn!(item_id = record.item_id(), "Ignoring outcome for already published item");
                return Ok(());
            }
            MergeDecision::Write => {}
        }

        let mut next = records.clone();
        next.insert(record.item_id().to_string(), record.clone());
        // Memory only changes once the document is safely on disk.
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn get(&self, item_id: &str) -> Result<Option<ProcessingRecord>, StoreError> {
        Ok(self.records.lock().await.get(item_id).cloned())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PostId;
    use crate::errors::ErrorKind;

    fn published(id: &str) -> ProcessingRecord {
        let mut r = ProcessingRecord::new(id);
        r.advance(Stage::Summarized, 1).unwrap();
        r.advance(Stage::Drafted, 1).unwrap();
        r.mark_published(PostId::new("77"), 2).unwrap();
        r
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProcessedItemStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        assert!(store.is_empty().await.unwrap());
        assert!(!store.has_succeeded("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = JsonFileProcessedItemStore::open(&path).await.unwrap();
            store.record_outcome(&published("a")).await.unwrap();

            let mut failed = ProcessingRecord::new("b");
            failed.fail_with(ErrorKind::MalformedInput, "bad", 1).unwrap();
            store.record_outcome(&failed).await.unwrap();
        }

        let reopened = JsonFileProcessedItemStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
        assert!(reopened.has_succeeded("a").await.unwrap());
        assert!(!reopened.has_succeeded("b").await.unwrap());
        assert_eq!(
            reopened.get("a").await.unwrap().unwrap().published_post_id(),
            Some(&PostId::new("77"))
        );
    }

    #[tokio::test]
    async fn test_recording_twice_leaves_document_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileProcessedItemStore::open(&path).await.unwrap();
        let record = published("a");

        store.record_outcome(&record).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        store.record_outcome(&record).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileProcessedItemStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_unknown_version_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, br#"{"version": 9, "records": {}}"#).unwrap();

        let err = JsonFileProcessedItemStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 9, .. }));
    }

    #[tokio::test]
    async fn test_hand_edited_inconsistent_record_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            br#"{"version": 1, "records": {"a": {"item_id": "a", "stage": "failed", "attempts": 1, "published_post_id": "77"}}}"#,
        )
        .unwrap();

        let err = JsonFileProcessedItemStore::open(&path).await.unwrap_err();
        assert!(matches!(&err, StoreError::Backend(msg) if msg.contains("'a'")));
    }

    #[tokio::test]
    async fn test_record_under_wrong_key_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            br#"{"version": 1, "records": {"a": {"item_id": "b", "stage": "fetched", "attempts": 0}}}"#,
        )
        .unwrap();

        let err = JsonFileProcessedItemStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("state.json");
        let store = JsonFileProcessedItemStore::open(&path).await.unwrap();

        let err = store.record_outcome(&published("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.has_succeeded("a").await.unwrap());
    }
}
