//! Core domain model types for newsdesk.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Feed items, articles and post ids
//! - The stage enum and its transition rules
//! - Per-item processing records
//! - The run report

mod item;
mod record;
mod report;
mod stage;

pub use item::{Article, FeedItem, PostId};
pub use record::{ProcessingRecord, Transition};
pub(crate) use report::RunReportBuilder;
pub use report::{BatchOutcome, ReconciliationEntry, RunCounts, RunReport, RunStatus};
pub use stage::Stage;
