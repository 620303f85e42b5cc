//! The content pipeline orchestrator.
//!
//! A run pulls the feed, drops items the store already published, summarizes
//! the rest, groups the summaries into batches and drafts and publishes one
//! article per batch. Every collaborator call goes through
//! [`call_with_retry`]. Item failures never abort a run; they end up as
//! `Failed` records in the report.

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::batching::{plan_batches, BatchSize};
use super::retry::{call_with_retry, RetryPolicy};
use crate::cancellation::CancellationToken;
use crate::collaborators::{Drafter, FeedSource, Publisher, Summarizer};
use crate::core::{
    Article, BatchOutcome, FeedItem, PostId, ProcessingRecord, ReconciliationEntry, RunReport,
    RunReportBuilder, RunStatus, Stage,
};
use crate::errors::{CollaboratorError, ErrorKind, InitializationError, PipelineError, TransitionError};
use crate::events::{kinds, EventSink, NoOpEventSink};
use crate::store::ProcessedItemStore;

/// Default bound for a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Retry policy applied to summarize, draft and publish calls.
    pub retry: RetryPolicy,
    /// Bound for every individual attempt.
    pub call_timeout: Duration,
    /// Items per drafted article.
    pub batch_size: BatchSize,
    /// Summaries computed at the same time. Never below 1.
    pub summarize_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            batch_size: BatchSize::All,
            summarize_concurrency: 1,
        }
    }
}

/// Drives feed items through fetch, summarize, draft and publish.
pub struct PipelineOrchestrator {
    source: Arc<dyn FeedSource>,
    summarizer: Arc<dyn Summarizer>,
    drafter: Arc<dyn Drafter>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn ProcessedItemStore>,
    events: Arc<dyn EventSink>,
    config: OrchestratorConfig,
    cancel: Arc<CancellationToken>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("source", &self.source.name())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// A summarized item waiting for its batch.
#[derive(Debug)]
struct Summarized {
    slot: usize,
    item_id: String,
    summary: String,
}

/// Mutable state of a run in progress.
///
/// `slots` holds one entry per accepted item in feed order; `None` marks an
/// item that was never started and is left out of the report.
struct RunState {
    report: RunReportBuilder,
    slots: Vec<Option<ProcessingRecord>>,
    halted: bool,
}

impl RunState {
    fn record_mut(&mut self, slot: usize) -> Option<&mut ProcessingRecord> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }
}

impl PipelineOrchestrator {
    /// Starts building an orchestrator.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Tunables in effect.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Token that aborts the run between items and batches.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Executes one run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Initialization`] when the feed source cannot
    /// start. Every other failure is reported through the returned
    /// [`RunReport`].
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let report = RunReportBuilder::start();
        let run_id = report.run_id();
        let span = info_span!("pipeline_run", %run_id, source = self.source.name());

        self.run_inner(report).instrument(span).await
    }

    async fn run_inner(&self, report: RunReportBuilder) -> Result<RunReport, PipelineError> {
        let mut state = RunState {
            report,
            slots: Vec::new(),
            halted: false,
        };

        self.events
            .emit(
                kinds::RUN_STARTED,
                Some(json!({
                    "run_id": state.report.run_id().to_string(),
                    "source": self.source.name(),
                })),
            )
            .await;
        info!("Pipeline run started");

        let items = self.collect_items(&mut state).await?;
        let candidates = self.filter_processed(items, &mut state).await;
        let summarized = self.summarize_all(candidates, &mut state).await;

        let batches = plan_batches(summarized, self.config.batch_size);
        debug!(batches = batches.len(), "Planned drafting batches");

        for (index, batch) in batches.into_iter().enumerate() {
            if state.halted {
                warn!(batch = index, "Run halted, not starting remaining batches");
                break;
            }
            if self.cancel.is_cancelled() {
                info!(batch = index, "Run cancelled before batch");
                break;
            }
            self.process_batch(index, batch, &mut state).await;
        }

        Ok(self.finish(state).await)
    }

    /// Reads the whole feed window. A mid-stream error truncates it.
    async fn collect_items(&self, state: &mut RunState) -> Result<Vec<FeedItem>, InitializationError> {
        let mut stream = self.source.fetch().await?;
        let mut items = Vec::new();

        while let Some(next) = stream.next().await {
            match next {
                Ok(item) => {
                    state.report.record_fetched();
                    items.push(item);
                }
                Err(e) => {
                    warn!(error = %e, fetched = items.len(), "Feed ended early");
                    break;
                }
            }
        }

        info!(fetched = items.len(), "Fetched feed items");
        Ok(items)
    }

    /// Drops items already published or repeated within this window.
    ///
    /// Returns the remaining items with the slot reserved for their record.
    async fn filter_processed(
        &self,
        items: Vec<FeedItem>,
        state: &mut RunState,
    ) -> Vec<(usize, FeedItem)> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for item in items {
            if self.cancel.is_cancelled() {
                break;
            }

            if !seen.insert(item.id().to_string()) {
                self.skip(item.id(), "repeated_in_feed", state).await;
                continue;
            }

            match self.store.has_succeeded(item.id()).await {
                Ok(true) => self.skip(item.id(), "already_published", state).await,
                Ok(false) => {
                    candidates.push((state.slots.len(), item));
                    state.slots.push(None);
                }
                Err(e) => {
                    warn!(item_id = item.id(), error = %e, "Store lookup failed, not processing item");
                    let mut record = ProcessingRecord::new(item.id());
                    let failed = record.fail_with(ErrorKind::Persistence, e.to_string(), 0);
                    log_rejected(failed);
                    self.settle_failure(&record, state).await;
                    state.slots.push(Some(record));
                }
            }
        }

        candidates
    }

    async fn skip(&self, item_id: &str, reason: &str, state: &mut RunState) {
        debug!(item_id, reason, "Skipping item");
        state.report.record_skipped(item_id);
        self.events
            .emit(
                kinds::ITEM_SKIPPED,
                Some(json!({ "item_id": item_id, "reason": reason })),
            )
            .await;
    }

    /// Summarizes candidates with bounded concurrency, keeping feed order.
    async fn summarize_all(
        &self,
        candidates: Vec<(usize, FeedItem)>,
        state: &mut RunState,
    ) -> Vec<Summarized> {
        let concurrency = self.config.summarize_concurrency.max(1);

        let results: Vec<_> = stream::iter(candidates)
            .map(|(slot, item)| async move {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let attempted = call_with_retry(
                    &self.config.retry,
                    self.config.call_timeout,
                    &self.cancel,
                    "summarize",
                    |_| self.summarizer.summarize(item.raw_text()),
                )
                .await;
                Some((slot, item, attempted))
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut summarized = Vec::new();
        for (slot, item, attempted) in results.into_iter().flatten() {
            let mut record = ProcessingRecord::new(item.id());
            match attempted.result {
                Ok(summary) => {
                    log_rejected(record.advance(Stage::Summarized, attempted.attempts));
                    self.stage_changed(&record).await;
                    summarized.push(Summarized {
                        slot,
                        item_id: item.id().to_string(),
                        summary,
                    });
                }
                Err(e) => {
                    log_rejected(record.fail(&e, attempted.attempts));
                    self.item_failed(&record).await;
                    self.settle_failure(&record, state).await;
                }
            }
            if let Some(entry) = state.slots.get_mut(slot) {
                *entry = Some(record);
            }
        }

        info!(summarized = summarized.len(), "Summarization finished");
        summarized
    }

    async fn process_batch(&self, index: usize, batch: Vec<Summarized>, state: &mut RunState) {
        let item_ids: Vec<String> = batch.iter().map(|s| s.item_id.clone()).collect();
        let slots: Vec<usize> = batch.iter().map(|s| s.slot).collect();
        let summaries: Vec<String> = batch.into_iter().map(|s| s.summary).collect();

        let drafted = call_with_retry(
            &self.config.retry,
            self.config.call_timeout,
            &self.cancel,
            "draft",
            |_| self.drafter.draft(&summaries),
        )
        .await;

        let article = match drafted.result {
            Ok(article) => article,
            Err(e) => {
                self.fail_batch(index, &item_ids, &slots, None, &e, drafted.attempts, state)
                    .await;
                return;
            }
        };

        for &slot in &slots {
            if let Some(record) = state.record_mut(slot) {
                log_rejected(record.advance(Stage::Drafted, drafted.attempts));
            }
        }
        for &slot in &slots {
            if let Some(record) = state.slots.get(slot).and_then(Option::as_ref) {
                self.stage_changed(record).await;
            }
        }
        self.events
            .emit(
                kinds::BATCH_DRAFTED,
                Some(json!({
                    "batch": index,
                    "item_ids": item_ids,
                    "title": article.title,
                    "tags": article.tags,
                    "attempts": drafted.attempts,
                })),
            )
            .await;

        let published = call_with_retry(
            &self.config.retry,
            self.config.call_timeout,
            &self.cancel,
            "publish",
            |_| self.publisher.publish(&article),
        )
        .await;

        match published.result {
            Ok(post_id) => {
                self.complete_batch(index, &item_ids, &slots, &article, post_id, published.attempts, state)
                    .await;
            }
            Err(e) => {
                self.fail_batch(index, &item_ids, &slots, Some(&article), &e, published.attempts, state)
                    .await;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn complete_batch(
        &self,
        index: usize,
        item_ids: &[String],
        slots: &[usize],
        article: &Article,
        post_id: PostId,
        attempts: u32,
        state: &mut RunState,
    ) {
        info!(batch = index, post_id = %post_id, items = item_ids.len(), "Batch published");

        for &slot in slots {
            let Some(record) = state.record_mut(slot) else {
                continue;
            };
            log_rejected(record.mark_published(post_id.clone(), attempts));
            let record = record.clone();
            self.stage_changed(&record).await;

            if let Err(e) = self.store.record_outcome(&record).await {
                error!(
                    item_id = record.item_id(),
                    post_id = %post_id,
                    error = %e,
                    "Published item could not be recorded, needs reconciliation"
                );
                state.report.record_reconciliation(ReconciliationEntry {
                    item_id: record.item_id().to_string(),
                    stage: record.stage(),
                    post_id: Some(post_id.clone()),
                    error: e.to_string(),
                });
                state.halted = true;
            }
        }

        state.report.record_batch(BatchOutcome {
            index,
            item_ids: item_ids.to_vec(),
            title: Some(article.title.clone()),
            post_id: Some(post_id.clone()),
            error: None,
            error_kind: None,
        });
        self.events
            .emit(
                kinds::BATCH_PUBLISHED,
                Some(json!({
                    "batch": index,
                    "item_ids": item_ids,
                    "post_id": post_id,
                    "attempts": attempts,
                })),
            )
            .await;
    }

    /// Fails every item of a batch with the same error.
    #[allow(clippy::too_many_arguments)]
    async fn fail_batch(
        &self,
        index: usize,
        item_ids: &[String],
        slots: &[usize],
        article: Option<&Article>,
        error: &CollaboratorError,
        attempts: u32,
        state: &mut RunState,
    ) {
        warn!(batch = index, items = item_ids.len(), attempts, error = %error, "Batch failed");

        for &slot in slots {
            let Some(record) = state.record_mut(slot) else {
                continue;
            };
            log_rejected(record.fail(error, attempts));
            let record = record.clone();
            self.item_failed(&record).await;
            self.settle_failure(&record, state).await;
        }

        state.report.record_batch(BatchOutcome {
            index,
            item_ids: item_ids.to_vec(),
            title: article.map(|a| a.title.clone()),
            post_id: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        });
        self.events
            .emit(
                kinds::BATCH_FAILED,
                Some(json!({
                    "batch": index,
                    "item_ids": item_ids,
                    "error": error.to_string(),
                    "error_kind": error.kind(),
                    "attempts": attempts,
                })),
            )
            .await;
    }

    /// Persists a failed record. Losing it only costs diagnostics, so the
    /// run goes on and the item is listed for reconciliation.
    async fn settle_failure(&self, record: &ProcessingRecord, state: &mut RunState) {
        if let Err(e) = self.store.record_outcome(record).await {
            warn!(item_id = record.item_id(), error = %e, "Failed outcome could not be recorded");
            state.report.record_reconciliation(ReconciliationEntry {
                item_id: record.item_id().to_string(),
                stage: record.stage(),
                post_id: None,
                error: e.to_string(),
            });
        }
    }

    async fn stage_changed(&self, record: &ProcessingRecord) {
        let Some(last) = record.history().last() else {
            return;
        };
        self.events
            .emit(
                kinds::ITEM_STAGE_CHANGED,
                Some(json!({
                    "item_id": record.item_id(),
                    "from": last.from,
                    "to": last.to,
                    "attempts": last.attempts,
                })),
            )
            .await;
    }

    async fn item_failed(&self, record: &ProcessingRecord) {
        warn!(
            item_id = record.item_id(),
            attempts = record.attempts(),
            error = record.last_error().unwrap_or_default(),
            "Item failed"
        );
        self.events
            .emit(
                kinds::ITEM_FAILED,
                Some(json!({
                    "item_id": record.item_id(),
                    "attempts": record.attempts(),
                    "error": record.last_error(),
                    "error_kind": record.last_error_kind(),
                })),
            )
            .await;
    }

    async fn finish(&self, state: RunState) -> RunReport {
        let (status, cancel_reason) = if state.halted {
            (RunStatus::Halted, None)
        } else if self.cancel.is_cancelled() {
            (RunStatus::Cancelled, self.cancel.reason())
        } else {
            (RunStatus::Completed, None)
        };

        let records = state.slots.into_iter().flatten().collect();
        let report = state.report.finish(status, cancel_reason, records);
        let counts = report.counts();

        info!(
            status = ?report.status(),
            fetched = counts.fetched,
            skipped = counts.skipped_duplicate,
            published = counts.published,
            failed = counts.failed,
            duration_ms = report.duration_ms(),
            "Pipeline run finished"
        );
        self.events
            .emit(
                kinds::RUN_COMPLETED,
                Some(json!({
                    "run_id": report.run_id().to_string(),
                    "status": report.status(),
                    "counts": counts,
                    "duration_ms": report.duration_ms(),
                })),
            )
            .await;

        report
    }
}

/// Transitions requested by the orchestrator follow the stage order, so a
/// rejection means a bug; it is logged and the record is left untouched.
fn log_rejected(result: Result<(), TransitionError>) {
    if let Err(e) = result {
        error!(error = %e, "Stage transition rejected");
    }
}

/// Builder for [`PipelineOrchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    source: Option<Arc<dyn FeedSource>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    drafter: Option<Arc<dyn Drafter>>,
    publisher: Option<Arc<dyn Publisher>>,
    store: Option<Arc<dyn ProcessedItemStore>>,
    events: Option<Arc<dyn EventSink>>,
    config: OrchestratorConfig,
    cancel: Option<Arc<CancellationToken>>,
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OrchestratorBuilder {
    /// Sets the feed source.
    #[must_use]
    pub fn source(mut self, source: impl FeedSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Sets the summarizer.
    #[must_use]
    pub fn summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Some(Arc::new(summarizer));
        self
    }

    /// Sets the drafter.
    #[must_use]
    pub fn drafter(mut self, drafter: impl Drafter + 'static) -> Self {
        self.drafter = Some(Arc::new(drafter));
        self
    }

    /// Sets the publisher.
    #[must_use]
    pub fn publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    /// Sets the processed-item store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ProcessedItemStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the event sink. Defaults to [`NoOpEventSink`].
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replaces all tunables at once.
    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Sets the drafting batch size.
    #[must_use]
    pub fn batch_size(mut self, size: BatchSize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Sets how many items are summarized at once.
    #[must_use]
    pub fn summarize_concurrency(mut self, concurrency: usize) -> Self {
        self.config.summarize_concurrency = concurrency.max(1);
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an [`InitializationError`] naming the first missing
    /// collaborator.
    pub fn build(self) -> Result<PipelineOrchestrator, InitializationError> {
        fn required<T: ?Sized>(value: Option<Arc<T>>, name: &str) -> Result<Arc<T>, InitializationError> {
            value.ok_or_else(|| InitializationError::new(name, "not configured"))
        }

        Ok(PipelineOrchestrator {
            source: required(self.source, "feed_source")?,
            summarizer: required(self.summarizer, "summarizer")?,
            drafter: required(self.drafter, "drafter")?,
            publisher: required(self.publisher, "publisher")?,
            store: required(self.store, "store")?,
            events: self.events.unwrap_or_else(|| Arc::new(NoOpEventSink)),
            config: self.config,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::events::CollectingEventSink;
    use crate::store::{InMemoryProcessedItemStore, MockProcessedItemStore};
    use crate::testing::{
        assert_failed_with, assert_published, feed_items, ScriptedDrafter, ScriptedPublisher,
        ScriptedSummarizer, StaticFeedSource,
    };

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::default().with_backoff_ms(Vec::new())
    }

    fn orchestrator(
        ids: &[&str],
        store: Arc<dyn ProcessedItemStore>,
        publisher: Arc<ScriptedPublisher>,
        batch_size: BatchSize,
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::builder()
            .source(StaticFeedSource::new(feed_items(ids)))
            .summarizer(ScriptedSummarizer::new())
            .drafter(ScriptedDrafter::new())
            .publisher(publisher)
            .store(store)
            .retry_policy(quick_policy())
            .batch_size(batch_size)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = PipelineOrchestrator::builder()
            .source(StaticFeedSource::new(Vec::new()))
            .build()
            .unwrap_err();
        assert_eq!(err.source_name, "summarizer");
    }

    #[test]
    fn test_builder_clamps_concurrency() {
        let builder = PipelineOrchestrator::builder().summarize_concurrency(0);
        assert_eq!(builder.config.summarize_concurrency, 1);
    }

    #[tokio::test]
    async fn test_unrecorded_publish_halts_run() {
        let mut store = MockProcessedItemStore::new();
        store.expect_has_succeeded().returning(|_| Ok(false));
        store.expect_record_outcome().returning(|record| {
            if record.stage() == Stage::Published {
                Err(StoreError::Backend("disk full".to_string()))
            } else {
                Ok(())
            }
        });
        let publisher = Arc::new(ScriptedPublisher::new());

        let report = orchestrator(&["a", "b"], Arc::new(store), Arc::clone(&publisher), BatchSize::fixed(1))
            .run()
            .await
            .unwrap();

        assert_eq!(report.status(), RunStatus::Halted);
        assert_eq!(report.exit_code(), RunReport::EXIT_RECONCILE);
        assert_eq!(publisher.call_count(), 1);
        assert_eq!(report.batches().len(), 1);

        let entry = &report.reconciliation()[0];
        assert_eq!(entry.item_id, "a");
        assert_eq!(entry.post_id, Some(PostId::new("post-1")));
        assert!(entry.error.contains("disk full"));

        // The published item keeps its post id; the second batch never started.
        assert_published(&report, "a");
        assert_eq!(report.record("b").unwrap().stage(), Stage::Summarized);
    }

    #[tokio::test]
    async fn test_store_lookup_failure_fails_item_without_processing() {
        let mut store = MockProcessedItemStore::new();
        store.expect_has_succeeded().returning(|id| {
            if id == "a" {
                Err(StoreError::Backend("locked".to_string()))
            } else {
                Ok(false)
            }
        });
        store.expect_record_outcome().returning(|_| Ok(()));
        let publisher = Arc::new(ScriptedPublisher::new());

        let report = orchestrator(&["a", "b"], Arc::new(store), Arc::clone(&publisher), BatchSize::All)
            .run()
            .await
            .unwrap();

        assert_failed_with(&report, "a", ErrorKind::Persistence, 0);
        assert_published(&report, "b");
        assert_eq!(report.status(), RunStatus::Completed);
        assert_eq!(report.counts().summarized, 1);
        assert_eq!(report.records()[0].item_id(), "a");
    }

    #[tokio::test]
    async fn test_unrecorded_failure_is_listed_but_run_continues() {
        let mut store = MockProcessedItemStore::new();
        store.expect_has_succeeded().returning(|_| Ok(false));
        store.expect_record_outcome().returning(|record| {
            if record.stage() == Stage::Failed {
                Err(StoreError::Backend("read-only".to_string()))
            } else {
                Ok(())
            }
        });
        let publisher = Arc::new(ScriptedPublisher::new());

        let report = PipelineOrchestrator::builder()
            .source(StaticFeedSource::new(feed_items(&["a", "b"])))
            .summarizer(ScriptedSummarizer::new().script(
                "a",
                [Err(CollaboratorError::generation(ErrorKind::MalformedInput, "empty"))],
            ))
            .drafter(ScriptedDrafter::new())
            .publisher(Arc::clone(&publisher))
            .store(Arc::new(store))
            .retry_policy(quick_policy())
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(report.status(), RunStatus::Completed);
        assert_published(&report, "b");
        assert_eq!(report.reconciliation().len(), 1);
        assert_eq!(report.reconciliation()[0].item_id, "a");
        assert_eq!(report.reconciliation()[0].post_id, None);
        assert_eq!(report.exit_code(), RunReport::EXIT_FAILURES);
    }

    #[tokio::test]
    async fn test_events_follow_run_lifecycle() {
        let events = Arc::new(CollectingEventSink::new());
        let store = Arc::new(InMemoryProcessedItemStore::new());

        let report = PipelineOrchestrator::builder()
            .source(StaticFeedSource::new(feed_items(&["a"])))
            .summarizer(ScriptedSummarizer::new())
            .drafter(ScriptedDrafter::new())
            .publisher(ScriptedPublisher::new())
            .store(store)
            .event_sink(events.clone())
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        assert!(report.is_healthy());
        assert_eq!(
            events.types(),
            vec![
                kinds::RUN_STARTED,
                kinds::ITEM_STAGE_CHANGED,
                kinds::ITEM_STAGE_CHANGED,
                kinds::BATCH_DRAFTED,
                kinds::ITEM_STAGE_CHANGED,
                kinds::BATCH_PUBLISHED,
                kinds::RUN_COMPLETED,
            ]
        );
        let completed = &events.payloads_of(kinds::RUN_COMPLETED)[0];
        assert_eq!(completed["status"], "completed");
        assert_eq!(completed["counts"]["published"], 1);
    }
}
