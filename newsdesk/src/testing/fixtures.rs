//! Feed item and record fixtures.

use crate::core::{FeedItem, PostId, ProcessingRecord, Stage};

/// Builds an item whose raw text is its id.
///
/// [`ScriptedSummarizer`](super::ScriptedSummarizer) scripts are keyed by raw
/// text, so a script for `"b"` applies to `feed_item("b")`.
#[must_use]
pub fn feed_item(id: &str) -> FeedItem {
    FeedItem::new(
        id,
        format!("Headline {id}"),
        format!("https://news.example.com/{id}"),
        id,
    )
}

/// Builds one [`feed_item`] per id, in order.
#[must_use]
pub fn feed_items(ids: &[&str]) -> Vec<FeedItem> {
    ids.iter().map(|id| feed_item(id)).collect()
}

/// A record that went all the way to `Published` in `post_id`, as an
/// earlier run would have stored it.
#[must_use]
pub fn published_record(item_id: &str, post_id: &str) -> ProcessingRecord {
    let mut record = ProcessingRecord::new(item_id);
    let applied = record
        .advance(Stage::Summarized, 1)
        .and_then(|()| record.advance(Stage::Drafted, 1))
        .and_then(|()| record.mark_published(PostId::new(post_id), 1));
    if let Err(e) = applied {
        panic!("Fixture transition rejected: {e}");
    }
    record
}
