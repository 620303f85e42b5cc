//! Run-level reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PostId, ProcessingRecord, Stage};
use crate::errors::ErrorKind;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every fetched item was driven to a terminal stage or skipped.
    Completed,
    /// An operator abort stopped the run between items or batches.
    Cancelled,
    /// A published batch could not be recorded; later batches were not started.
    Halted,
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Items read from the feed source.
    pub fetched: usize,
    /// Items skipped because they were already published.
    pub skipped_duplicate: usize,
    /// Items that reached at least `Summarized`.
    pub summarized: usize,
    /// Items that reached at least `Drafted`.
    pub drafted: usize,
    /// Items that ended `Published`.
    pub published: usize,
    /// Items that ended `Failed`.
    pub failed: usize,
}

/// Outcome of one drafted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Position of the batch within the run.
    pub index: usize,
    /// Items that contributed to the batch, in feed order.
    pub item_ids: Vec<String>,
    /// Title of the drafted article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Post created for the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// Failure that ended the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Kind of that failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// An outcome that could not be persisted and needs operator attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    /// Affected item.
    pub item_id: String,
    /// Stage the item reached but the store does not know about.
    pub stage: Stage,
    /// Post created for the item, if it was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// The persistence error.
    pub error: String,
}

/// Immutable summary of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancel_reason: Option<String>,
    counts: RunCounts,
    skipped: Vec<String>,
    records: Vec<ProcessingRecord>,
    batches: Vec<BatchOutcome>,
    reconciliation: Vec<ReconciliationEntry>,
}

impl RunReport {
    /// Exit status for a healthy run.
    pub const EXIT_OK: i32 = 0;
    /// Exit status when items failed or the run was cancelled.
    pub const EXIT_FAILURES: i32 = 1;
    /// Exit status when the run never started.
    pub const EXIT_INITIALIZATION: i32 = 2;
    /// Exit status when published items could not be recorded.
    pub const EXIT_RECONCILE: i32 = 3;

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the run was finalized.
    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// How the run ended.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Why the run was cancelled, if it was.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Aggregate counts.
    #[must_use]
    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    /// Ids skipped as duplicates, in feed order.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Records of every processed item, in feed order.
    #[must_use]
    pub fn records(&self) -> &[ProcessingRecord] {
        &self.records
    }

    /// Record for one item.
    #[must_use]
    pub fn record(&self, item_id: &str) -> Option<&ProcessingRecord> {
        self.records.iter().find(|r| r.item_id() == item_id)
    }

    /// Per-batch outcomes.
    #[must_use]
    pub fn batches(&self) -> &[BatchOutcome] {
        &self.batches
    }

    /// Outcomes the store does not know about.
    #[must_use]
    pub fn reconciliation(&self) -> &[ReconciliationEntry] {
        &self.reconciliation
    }

    /// Run duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Returns true if nothing failed and nothing needs reconciling.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == RunStatus::Completed
            && self.counts.failed == 0
            && self.reconciliation.is_empty()
    }

    /// Process exit status communicating run health.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.status == RunStatus::Halted
            || self.reconciliation.iter().any(|e| e.post_id.is_some())
        {
            Self::EXIT_RECONCILE
        } else if self.is_healthy() {
            Self::EXIT_OK
        } else {
            Self::EXIT_FAILURES
        }
    }
}

/// Mutable run state owned by the orchestrator until the run ends.
#[derive(Debug)]
pub(crate) struct RunReportBuilder {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    fetched: usize,
    skipped: Vec<String>,
    batches: Vec<BatchOutcome>,
    reconciliation: Vec<ReconciliationEntry>,
}

impl RunReportBuilder {
    pub(crate) fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            fetched: 0,
            skipped: Vec::new(),
            batches: Vec::new(),
            reconciliation: Vec::new(),
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub(crate) fn record_fetched(&mut self) {
        self.fetched += 1;
    }

    pub(crate) fn record_skipped(&mut self, item_id: impl Into<String>) {
        self.skipped.push(item_id.into());
    }

    pub(crate) fn record_batch(&mut self, outcome: BatchOutcome) {
        self.batches.push(outcome);
    }

    pub(crate) fn record_reconciliation(&mut self, entry: ReconciliationEntry) {
        self.reconciliation.push(entry);
    }

    /// Freezes the report. Counts are derived from final record state.
    pub(crate) fn finish(
        self,
        status: RunStatus,
        cancel_reason: Option<String>,
        records: Vec<ProcessingRecord>,
    ) -> RunReport {
        let counts = RunCounts {
            fetched: self.fetched,
            skipped_duplicate: self.skipped.len(),
            summarized: records.iter().filter(|r| r.has_reached(Stage::Summarized)).count(),
            drafted: records.iter().filter(|r| r.has_reached(Stage::Drafted)).count(),
            published: records.iter().filter(|r| r.stage() == Stage::Published).count(),
            failed: records.iter().filter(|r| r.stage() == Stage::Failed).count(),
        };

        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            status,
            cancel_reason,
            counts,
            skipped: self.skipped,
            records,
            batches: self.batches,
            reconciliation: self.reconciliation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn published(id: &str) -> ProcessingRecord {
        let mut r = ProcessingRecord::new(id);
        r.advance(Stage::Summarized, 1).unwrap();
        r.advance(Stage::Drafted, 1).unwrap();
        r.mark_published(PostId::new("7"), 1).unwrap();
        r
    }

    fn failed_after_summary(id: &str) -> ProcessingRecord {
        let mut r = ProcessingRecord::new(id);
        r.advance(Stage::Summarized, 1).unwrap();
        r.fail_with(ErrorKind::ServerError, "draft", 3).unwrap();
        r
    }

    #[test]
    fn test_counts_derive_from_records() {
        let mut builder = RunReportBuilder::start();
        for _ in 0..4 {
            builder.record_fetched();
        }
        builder.record_skipped("a");

        let report = builder.finish(
            RunStatus::Completed,
            None,
            vec![failed_after_summary("b"), published("c")],
        );

        assert_eq!(
            report.counts(),
            RunCounts {
                fetched: 4,
                skipped_duplicate: 1,
                summarized: 2,
                drafted: 1,
                published: 1,
                failed: 1,
            }
        );
        assert_eq!(report.skipped(), &["a".to_string()]);
        assert_eq!(report.record("c").unwrap().stage(), Stage::Published);
    }

    #[test]
    fn test_counts_ignore_record_order() {
        let a = RunReportBuilder::start().finish(
            RunStatus::Completed,
            None,
            vec![published("x"), failed_after_summary("y")],
        );
        let b = RunReportBuilder::start().finish(
            RunStatus::Completed,
            None,
            vec![failed_after_summary("y"), published("x")],
        );
        assert_eq!(a.counts(), b.counts());
    }

    #[test]
    fn test_exit_codes() {
        let healthy = RunReportBuilder::start().finish(RunStatus::Completed, None, vec![published("a")]);
        assert!(healthy.is_healthy());
        assert_eq!(healthy.exit_code(), RunReport::EXIT_OK);

        let with_failure = RunReportBuilder::start().finish(
            RunStatus::Completed,
            None,
            vec![failed_after_summary("b")],
        );
        assert_eq!(with_failure.exit_code(), RunReport::EXIT_FAILURES);

        let cancelled = RunReportBuilder::start().finish(
            RunStatus::Cancelled,
            Some("operator".to_string()),
            Vec::new(),
        );
        assert!(!cancelled.is_healthy());
        assert_eq!(cancelled.cancel_reason(), Some("operator"));
        assert_eq!(cancelled.exit_code(), RunReport::EXIT_FAILURES);

        let mut builder = RunReportBuilder::start();
        builder.record_reconciliation(ReconciliationEntry {
            item_id: "c".to_string(),
            stage: Stage::Published,
            post_id: Some(PostId::new("9")),
            error: "disk full".to_string(),
        });
        let halted = builder.finish(RunStatus::Halted, None, vec![published("c")]);
        assert_eq!(halted.exit_code(), RunReport::EXIT_RECONCILE);
    }

    #[test]
    fn test_report_serializes_status() {
        let report = RunReportBuilder::start().finish(RunStatus::Completed, None, Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["counts"]["fetched"], 0);
        assert!(report.duration_ms() >= 0);
    }
}
