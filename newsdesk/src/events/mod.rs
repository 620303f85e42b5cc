//! Lifecycle events emitted by the orchestrator.
//!
//! Sinks are injected into each orchestrator; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod kinds {
    /// A run started; carries the run id.
    pub const RUN_STARTED: &str = "run.started";
    /// An item was skipped as already published or repeated.
    pub const ITEM_SKIPPED: &str = "item.skipped";
    /// An item moved forward by one stage.
    pub const ITEM_STAGE_CHANGED: &str = "item.stage_changed";
    /// An item reached `Failed`.
    pub const ITEM_FAILED: &str = "item.failed";
    /// A batch produced an article.
    pub const BATCH_DRAFTED: &str = "batch.drafted";
    /// A batch produced a post.
    pub const BATCH_PUBLISHED: &str = "batch.published";
    /// A batch failed as a whole.
    pub const BATCH_FAILED: &str = "batch.failed";
    /// A run ended; carries status and counts.
    pub const RUN_COMPLETED: &str = "run.completed";
}
