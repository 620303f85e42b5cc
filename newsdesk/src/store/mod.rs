//! Durable memory of which feed items already produced a post.
//!
//! The store is what makes publishing idempotent across runs: an item whose
//! record is `Published` is skipped by every later run. Failed items are
//! recorded too, but only for diagnostics; they are retried next run.

mod file;
mod memory;

pub use file::JsonFileProcessedItemStore;
pub use memory::InMemoryProcessedItemStore;

use async_trait::async_trait;

use crate::core::{ProcessingRecord, Stage};
use crate::errors::StoreError;

/// Persistence for per-item outcomes, keyed by feed item id.
///
/// Both operations are safe to repeat. Recording an identical record twice
/// is a no-op, and a `Published` record is never replaced by a record in
/// another stage. Writes are atomic per item.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessedItemStore: Send + Sync {
    /// Returns true if the item already ended up in a published post.
    async fn has_succeeded(&self, item_id: &str) -> Result<bool, StoreError>;

    /// Persists the outcome of an item.
    async fn record_outcome(&self, record: &ProcessingRecord) -> Result<(), StoreError>;

    /// Returns the stored record of an item.
    async fn get(&self, item_id: &str) -> Result<Option<ProcessingRecord>, StoreError>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize, StoreError>;

    /// Returns true if nothing was recorded yet.
    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }
}

/// What a store should do with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeDecision {
    /// Store the incoming record.
    Write,
    /// Identical record already stored.
    Unchanged,
    /// A published record is stored; the incoming one would demote it.
    KeepPublished,
}

pub(crate) fn merge_decision(
    existing: Option<&ProcessingRecord>,
    incoming: &ProcessingRecord,
) -> MergeDecision {
    match existing {
        None => MergeDecision::Write,
        Some(current) if current == incoming => MergeDecision::Unchanged,
        Some(current) if current.stage() == Stage::Published => MergeDecision::KeepPublished,
        Some(_) => MergeDecision::Write,
    }
}
