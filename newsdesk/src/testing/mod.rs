//! Testing utilities for newsdesk pipelines.
//!
//! This module provides:
//! - Scripted feed source, summarizer, drafter and publisher doubles
//! - Feed item and record fixtures
//! - Assertions over run reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_failed_with, assert_not_in_report, assert_published, assert_stage,
};
pub use fixtures::{feed_item, feed_items, published_record};
pub use mocks::{ScriptedDrafter, ScriptedPublisher, ScriptedSummarizer, StaticFeedSource};
