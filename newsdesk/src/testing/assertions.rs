//! Assertions over run reports.

use crate::core::{PostId, RunReport, Stage};
use crate::errors::ErrorKind;

/// Asserts that `item_id` ended in `expected`.
pub fn assert_stage(report: &RunReport, item_id: &str, expected: Stage) {
    let record = report
        .record(item_id)
        .unwrap_or_else(|| panic!("No record for item '{item_id}' in report"));
    assert_eq!(
        record.stage(),
        expected,
        "Expected item '{item_id}' in stage {expected}, got {}",
        record.stage()
    );
}

/// Asserts that `item_id` was published, returning its post id.
pub fn assert_published(report: &RunReport, item_id: &str) -> PostId {
    assert_stage(report, item_id, Stage::Published);
    report
        .record(item_id)
        .and_then(|r| r.published_post_id().cloned())
        .unwrap_or_else(|| panic!("Published item '{item_id}' has no post id"))
}

/// Asserts that `item_id` failed with `kind` after `attempts` attempts.
pub fn assert_failed_with(report: &RunReport, item_id: &str, kind: ErrorKind, attempts: u32) {
    assert_stage(report, item_id, Stage::Failed);
    let record = report.record(item_id).unwrap_or_else(|| unreachable!());
    assert_eq!(
        record.last_error_kind(),
        Some(kind),
        "Expected item '{item_id}' to fail with {kind}, got {:?}",
        record.last_error_kind()
    );
    assert_eq!(
        record.attempts(),
        attempts,
        "Expected item '{item_id}' to use {attempts} attempts"
    );
}

/// Asserts that the report holds no record for `item_id`.
pub fn assert_not_in_report(report: &RunReport, item_id: &str) {
    assert!(
        report.record(item_id).is_none(),
        "Expected no record for '{item_id}', found stage {:?}",
        report.record(item_id).map(crate::core::ProcessingRecord::stage)
    );
}
