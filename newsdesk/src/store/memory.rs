//! In-memory processed-item store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

use super::{merge_decision, MergeDecision, ProcessedItemStore};
use crate::core::{ProcessingRecord, Stage};
use crate::errors::StoreError;

/// Store kept in a concurrent map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryProcessedItemStore {
    records: DashMap<String, ProcessingRecord>,
}

impl InMemoryProcessedItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = ProcessingRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.item_id().to_string(), record);
        }
        store
    }
}

#[async_trait]
impl ProcessedItemStore for InMemoryProcessedItemStore {
    async fn has_succeeded(&self, item_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .get(item_id)
            .is_some_and(|r| r.stage() == Stage::Published))
    }

    async fn record_outcome(&self, record: &ProcessingRecord) -> Result<(), StoreError> {
        match self.records.entry(record.item_id().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
            Entry::Occupied(mut slot) => match merge_decision(Some(slot.get()), record) {
                MergeDecision::Write => {
                    slot.insert(record.clone());
                }
                MergeDecision::Unchanged => {}
                MergeDecision::KeepPublished => {
                    warn!(item_id = record.item_id(), "Ignoring outcome for already published item");
                }
            },
        }
        Ok(())
    }

    async fn get(&self, item_id: &str) -> Result<Option<ProcessingRecord>, StoreError> {
        Ok(self.records.get(item_id).map(|r| r.clone()))
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
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
        r.mark_published(PostId::new("10"), 1).unwrap();
        r
    }

    #[tokio::test]
    async fn test_in_memory_store_basic() {
        let store = InMemoryProcessedItemStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(!store.has_succeeded("a").await.unwrap());

        store.record_outcome(&published("a")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.has_succeeded("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap().unwrap().stage(), Stage::Published);
    }

    #[tokio::test]
    async fn test_recording_twice_is_noop() {
        let store = InMemoryProcessedItemStore::new();
        let record = published("a");

        store.record_outcome(&record).await.unwrap();
        store.record_outcome(&record).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.has_succeeded("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_failed_item_is_not_succeeded_and_can_be_upgraded() {
        let store = InMemoryProcessedItemStore::new();
        let mut failed = ProcessingRecord::new("b");
        failed.fail_with(ErrorKind::Transport, "down", 3).unwrap();

        store.record_outcome(&failed).await.unwrap();
        assert!(!store.has_succeeded("b").await.unwrap());

        store.record_outcome(&published("b")).await.unwrap();
        assert!(store.has_succeeded("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_published_is_never_demoted() {
        let store = InMemoryProcessedItemStore::with_records([published("c")]);
        let mut failed = ProcessingRecord::new("c");
        failed.fail_with(ErrorKind::ServerError, "oops", 1).unwrap();

        store.record_outcome(&failed).await.unwrap();

        assert!(store.has_succeeded("c").await.unwrap());
    }
}
